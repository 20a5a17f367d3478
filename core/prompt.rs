use crate::scan::ScanResult;
use log;

const HEADER_RULE: &str =
    "================================================================================";

/// The assembled prompt payload plus bookkeeping for the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub text: String,
    pub included: usize,
    pub omitted: usize,
}

/// Concatenate loaded files into one payload bounded by `max_size` characters.
///
/// Files are taken in collector order, each preceded by a path header so the
/// backend can attribute suggestions. A file whose header plus content would
/// push the payload past the budget is omitted whole, along with everything
/// after it; nothing is ever truncated mid-content. Pure function of its
/// inputs: identical scan result and budget produce byte-identical output.
pub fn assemble_payload(scan: &ScanResult, max_size: usize) -> Payload {
    let mut text = String::new();
    let mut included = 0usize;

    for file in &scan.files {
        let section = format!(
            "\n{rule}\nFILE: {path}\nLANGUAGE: {language}\n{rule}\n\n{content}",
            rule = HEADER_RULE,
            path = file.relative_path.display(),
            language = language_from_extension(&file.extension),
            content = file.content,
        );
        if text.len() + section.len() > max_size {
            break;
        }
        text.push_str(&section);
        included += 1;
    }

    let omitted = scan.files.len() - included;
    if omitted > 0 {
        log::warn!(
            "Payload budget of {} bytes reached: {} of {} files omitted.",
            max_size,
            omitted,
            scan.files.len()
        );
    }

    Payload {
        text,
        included,
        omitted,
    }
}

pub fn language_from_extension(extension: &str) -> &'static str {
    match extension {
        ".py" => "Python",
        ".js" => "JavaScript",
        ".jsx" => "React JavaScript",
        ".ts" => "TypeScript",
        ".tsx" => "React TypeScript",
        ".go" => "Go",
        ".java" => "Java",
        ".cs" => "C#",
        ".cpp" => "C++",
        ".c" => "C",
        ".rb" => "Ruby",
        ".rs" => "Rust",
        ".php" => "PHP",
        ".kt" => "Kotlin",
        ".swift" => "Swift",
        ".scala" => "Scala",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{ScanResult, SourceFile};
    use std::path::PathBuf;

    fn source_file(rel: &str, ext: &str, content: &str) -> SourceFile {
        SourceFile {
            relative_path: PathBuf::from(rel),
            extension: ext.to_string(),
            content: content.to_string(),
            size: content.len(),
        }
    }

    fn scan_with(files: Vec<SourceFile>) -> ScanResult {
        ScanResult {
            files,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn payload_carries_path_and_language_headers() {
        let scan = scan_with(vec![source_file("src/main.py", ".py", "print(1)")]);
        let payload = assemble_payload(&scan, 1024 * 1024);

        assert!(payload.text.contains("FILE: src/main.py"));
        assert!(payload.text.contains("LANGUAGE: Python"));
        assert!(payload.text.contains("print(1)"));
        assert_eq!(payload.included, 1);
        assert_eq!(payload.omitted, 0);
    }

    #[test]
    fn assembly_is_deterministic() {
        let scan = scan_with(vec![
            source_file("a.rs", ".rs", "fn a() {}"),
            source_file("b.rs", ".rs", "fn b() {}"),
        ]);
        let first = assemble_payload(&scan, 4096);
        let second = assemble_payload(&scan, 4096);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn budget_is_never_exceeded_and_counts_add_up() {
        let scan = scan_with(vec![
            source_file("a.py", ".py", &"x".repeat(100)),
            source_file("b.py", ".py", &"y".repeat(100)),
            source_file("c.py", ".py", &"z".repeat(100)),
        ]);
        // Budget fits roughly one section.
        let budget = 300;
        let payload = assemble_payload(&scan, budget);

        assert!(payload.text.len() <= budget);
        assert_eq!(payload.included + payload.omitted, scan.files.len());
        assert!(payload.omitted >= 1);
    }

    #[test]
    fn files_are_never_truncated_mid_content() {
        let big = "a".repeat(200);
        let scan = scan_with(vec![
            source_file("small.py", ".py", "ok"),
            source_file("big.py", ".py", &big),
        ]);
        let payload = assemble_payload(&scan, 250);

        // The small file fits; the big one must be absent entirely.
        assert!(payload.text.contains("ok"));
        assert!(!payload.text.contains(&big));
        assert_eq!(payload.included, 1);
        assert_eq!(payload.omitted, 1);
    }

    #[test]
    fn omission_stops_at_first_overflow_preserving_order() {
        let scan = scan_with(vec![
            source_file("a.py", ".py", &"a".repeat(50)),
            source_file("b.py", ".py", &"b".repeat(5000)),
            source_file("c.py", ".py", "c"),
        ]);
        let payload = assemble_payload(&scan, 400);

        // Once b.py overflows, c.py is omitted too even though it would fit.
        assert_eq!(payload.included, 1);
        assert_eq!(payload.omitted, 2);
    }

    #[test]
    fn empty_scan_yields_empty_payload() {
        let payload = assemble_payload(&scan_with(Vec::new()), 4096);
        assert!(payload.text.is_empty());
        assert_eq!(payload.included, 0);
        assert_eq!(payload.omitted, 0);
    }
}
