use crate::config::ScanConfig;
use crate::error::{AppError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use log;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One candidate source file, loaded into memory for prompt assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the scanned root.
    pub relative_path: PathBuf,
    /// Lowercased extension with leading dot, e.g. ".py".
    pub extension: String,
    pub content: String,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    TooLarge,
    BinaryOrUndecodable,
    Unreadable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::TooLarge => "too-large",
            SkipReason::BinaryOrUndecodable => "binary-or-undecodable",
            SkipReason::Unreadable => "unreadable",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Outcome of one scan pass.
///
/// `skipped` records per-file recoverable problems only. Paths under an
/// ignored directory name or without an allow-listed extension are excluded
/// by design and never appear here.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files: Vec<SourceFile>,
    pub skipped: Vec<SkippedFile>,
}

impl ScanResult {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size as u64).sum()
    }
}

/// Walk `root` and load every allow-listed file at or below the size ceiling.
///
/// Ordering is deterministic: depth-first with lexicographic comparison of
/// relative path components. Symbolic links are never followed, so a link
/// pointing outside the root cannot introduce cycles or escape it.
pub fn scan_codebase(root: &Path, config: &ScanConfig) -> Result<ScanResult> {
    if !root.exists() {
        return Err(AppError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(AppError::NotADirectory(root.to_path_buf()));
    }

    let ignore_dirs: HashSet<String> = config.ignore_dirs.iter().cloned().collect();
    let extensions: HashSet<String> = config
        .extensions
        .iter()
        .map(|e| e.to_lowercase())
        .collect();
    let exclude_set = build_glob_set_from_vec(&config.exclude)?;
    let max_file_size = config.max_file_size_bytes()?;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .follow_links(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b));
    // Prune ignored directories by name at any depth; their contents are
    // excluded by design, not recorded as skipped.
    builder.filter_entry(move |entry| {
        // The root itself is never pruned, whatever it is named.
        if entry.depth() == 0 {
            return true;
        }
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        if !is_dir {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !ignore_dirs.contains(name.as_ref())
    });

    log::info!("Scanning directory: {}", root.display());
    let mut result = ScanResult::default();

    for entry_result in builder.build() {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Error walking directory: {}", e);
                let path = walk_error_path(&e).unwrap_or_else(|| root.to_path_buf());
                let path = pathdiff::diff_paths(&path, root).unwrap_or(path);
                result.skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::Unreadable,
                });
                continue;
            }
        };

        if entry.depth() == 0 || entry.file_type().is_some_and(|ft| ft.is_dir()) {
            continue;
        }

        let path = entry.path();
        let Some(relative_path) = pathdiff::diff_paths(path, root) else {
            log::warn!("Could not get relative path for: {}", path.display());
            continue;
        };

        let Some(extension) = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        else {
            log::trace!("Excluding extension-less file: {}", relative_path.display());
            continue;
        };
        if !extensions.contains(&extension) {
            log::trace!("Excluding unsupported file: {}", relative_path.display());
            continue;
        }
        if exclude_set.is_match(&relative_path) {
            log::trace!(
                "Excluding file matching exclude pattern: {}",
                relative_path.display()
            );
            continue;
        }

        match load_source_file(path, relative_path.clone(), extension, max_file_size) {
            Ok(source_file) => result.files.push(source_file),
            Err(reason) => {
                log::debug!("Skipping {} ({})", relative_path.display(), reason);
                result.skipped.push(SkippedFile {
                    path: relative_path,
                    reason,
                });
            }
        }
    }

    // The walker already sorts within each directory; sort once more so the
    // final ordering never depends on traversal internals.
    result.files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    result.skipped.sort_by(|a, b| a.path.cmp(&b.path));

    log::info!(
        "Scan complete: {} files loaded, {} skipped.",
        result.files.len(),
        result.skipped.len()
    );
    Ok(result)
}

/// Load one candidate file, or report why it was skipped.
///
/// Oversized files are rejected on metadata alone and never read.
fn load_source_file(
    path: &Path,
    relative_path: PathBuf,
    extension: String,
    max_file_size: u64,
) -> std::result::Result<SourceFile, SkipReason> {
    let metadata = fs::metadata(path).map_err(|e| {
        log::debug!("Failed to stat {}: {}", path.display(), e);
        SkipReason::Unreadable
    })?;
    if metadata.len() > max_file_size {
        return Err(SkipReason::TooLarge);
    }

    let bytes = fs::read(path).map_err(|e| {
        log::debug!("Failed to read {}: {}", path.display(), e);
        SkipReason::Unreadable
    })?;
    let size = bytes.len();
    let content = String::from_utf8(bytes).map_err(|_| SkipReason::BinaryOrUndecodable)?;

    Ok(SourceFile {
        relative_path,
        extension,
        content,
        size,
    })
}

fn build_glob_set_from_vec(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed_pattern = pattern_str.trim().to_string();
        if processed_pattern.ends_with('/') && processed_pattern.len() > 1 {
            processed_pattern.push_str("**");
        }
        match Glob::new(&processed_pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                log::error!("Invalid glob pattern \"{}\": {}", pattern_str, e);
                return Err(AppError::Glob(format!(
                    "Invalid glob pattern \"{}\" (processed as \"{}\"): {}",
                    pattern_str, processed_pattern, e
                )));
            }
        }
    }
    builder.build().map_err(|e| {
        log::error!("Error building glob set: {}", e);
        AppError::Glob(e.to_string())
    })
}

fn walk_error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } => walk_error_path(err),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn rel_paths(result: &ScanResult) -> Vec<String> {
        result
            .files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn ignored_directories_are_excluded_not_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "main.py", b"print(1)");
        write(tmp.path(), "node_modules/x.js", b"var x = 1;");

        let result = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();

        assert_eq!(rel_paths(&result), vec!["main.py"]);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn oversized_file_is_recorded_too_large() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "big.go", &vec![b'a'; 2 * 1024 * 1024]);
        write(tmp.path(), "small.rb", b"puts 'hi'!");

        let result = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();

        assert_eq!(rel_paths(&result), vec!["small.rb"]);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].path, PathBuf::from("big.go"));
        assert_eq!(result.skipped[0].reason, SkipReason::TooLarge);
    }

    #[test]
    fn loaded_content_round_trips_exactly() {
        let tmp = TempDir::new().unwrap();
        let text = "fn main() {\n    println!(\"héllo\");\n}\n";
        write(tmp.path(), "src/main.rs", text.as_bytes());

        let result = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].content, text);
        assert_eq!(result.files[0].size, text.len());
        assert_eq!(result.files[0].extension, ".rs");
    }

    #[test]
    fn non_utf8_file_is_recorded_binary() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "blob.py", &[0xff, 0xfe, 0x00, 0x80]);

        let result = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();

        assert!(result.files.is_empty());
        assert_eq!(result.skipped[0].reason, SkipReason::BinaryOrUndecodable);
    }

    #[test]
    fn unsupported_extensions_are_excluded_silently() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "README.md", b"# readme");
        write(tmp.path(), "data.bin", b"data");
        write(tmp.path(), "Makefile", b"all:");
        write(tmp.path(), "app.py", b"pass");

        let result = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();

        assert_eq!(rel_paths(&result), vec!["app.py"]);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn ordering_is_deterministic_and_lexicographic() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.py", b"2");
        write(tmp.path(), "a/z.py", b"3");
        write(tmp.path(), "a.py", b"1");

        let first = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();
        let second = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();

        // Component-wise comparison: "a" sorts before "a.py", so the
        // directory's contents come first.
        assert_eq!(rel_paths(&first), vec!["a/z.py", "a.py", "b.py"]);
        assert_eq!(rel_paths(&first), rel_paths(&second));
    }

    #[test]
    fn exclude_globs_filter_relative_paths() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/app.py", b"pass");
        write(tmp.path(), "src/gen_schema.py", b"pass");

        let config = ScanConfig {
            exclude: vec!["**/gen_*.py".to_string()],
            ..ScanConfig::default()
        };
        let result = scan_codebase(tmp.path(), &config).unwrap();

        assert_eq!(rel_paths(&result), vec!["src/app.py"]);
    }

    #[test]
    fn missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        let result = scan_codebase(&missing, &ScanConfig::default());
        assert!(matches!(result, Err(AppError::RootNotFound(_))));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "main.py", b"print(1)");
        let result = scan_codebase(&tmp.path().join("main.py"), &ScanConfig::default());
        assert!(matches!(result, Err(AppError::NotADirectory(_))));
    }

    #[test]
    fn empty_files_are_kept() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "empty.py", b"");

        let result = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].size, 0);
    }
}
