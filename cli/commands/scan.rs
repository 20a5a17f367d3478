use crate::cli_args::ScanArgs;
use crate::load_config_for_command;
use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use log;
use serde::Serialize;
use std::io::{self, Write};
use codesage_core::{self as core, Config, ScanResult};

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub root: String,
    pub total_files: usize,
    pub total_bytes: u64,
    pub files: Vec<FileRow>,
    pub skipped: Vec<SkipRow>,
}

#[derive(Debug, Serialize)]
pub struct FileRow {
    pub path: String,
    pub language: String,
    pub bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct SkipRow {
    pub path: String,
    pub reason: core::SkipReason,
}

pub fn handle_scan_command(args: ScanArgs, quiet: bool) -> Result<()> {
    let root = Config::resolve_root(&args.project.path)
        .context("Failed to resolve target directory")?;
    log::info!("Target directory resolved: {}", root.display());

    let config = load_config_for_command(&root, &args.project, None)
        .context("Failed to load configuration for scan command")?;

    let scan = core::scan_codebase(&root, &config.scan)
        .context("Failed to scan the target directory")?;

    let report = build_scan_report(&root.to_string_lossy(), &scan);

    if let Some(output) = render_scan_output(&report, args.format.as_deref(), quiet)? {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").context("Failed to write to stdout")?;
    }
    Ok(())
}

/// JSON output is the command's product and always prints; the summary
/// table is informational and `--quiet` suppresses it.
fn render_scan_output(
    report: &ScanReport,
    format: Option<&str>,
    quiet: bool,
) -> Result<Option<String>> {
    match format {
        Some("json") => Ok(Some(
            serde_json::to_string_pretty(report).map_err(core::AppError::JsonSerialize)?,
        )),
        _ if quiet => {
            log::debug!("Suppressing scan summary table (--quiet).");
            Ok(None)
        }
        _ if report.total_files == 0 && report.skipped.is_empty() => {
            Ok(Some("No analyzable source files found.".to_string()))
        }
        _ => Ok(Some(render_scan_table(report))),
    }
}

fn build_scan_report(root: &str, scan: &ScanResult) -> ScanReport {
    ScanReport {
        root: root.to_string(),
        total_files: scan.files.len(),
        total_bytes: scan.total_bytes(),
        files: scan
            .files
            .iter()
            .map(|f| FileRow {
                path: f.relative_path.to_string_lossy().to_string(),
                language: core::language_from_extension(&f.extension).to_string(),
                bytes: f.size,
            })
            .collect(),
        skipped: scan
            .skipped
            .iter()
            .map(|s| SkipRow {
                path: s.path.to_string_lossy().to_string(),
                reason: s.reason,
            })
            .collect(),
    }
}

fn render_scan_table(report: &ScanReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", " Scan Summary ".green().bold().underline()));
    out.push_str(&format!(
        "{:<20} {}\n",
        "Total Files:".green(),
        report.total_files.to_string().cyan()
    ));
    let total_readable = Byte::from_u64(report.total_bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string();
    out.push_str(&format!(
        "{:<20} {}\n",
        "Total Size:".green(),
        total_readable.cyan()
    ));

    if !report.files.is_empty() {
        out.push_str(&format!("\n{}\n", " Files ".green().bold().underline()));
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Language").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
        ]);
        for file in &report.files {
            let readable = Byte::from_u64(file.bytes as u64)
                .get_appropriate_unit(UnitType::Binary)
                .to_string();
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(&file.language),
                Cell::new(readable)
                    .set_alignment(comfy_table::CellAlignment::Right)
                    .fg(Color::DarkGrey),
            ]);
        }
        out.push_str(&format!("{table}\n"));
    }

    if !report.skipped.is_empty() {
        out.push_str(&format!("\n{}\n", " Skipped ".yellow().bold().underline()));
        for skip in &report.skipped {
            out.push_str(&format!(" - {} ({})\n", skip.path, skip.reason));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesage_core::{ScanConfig, scan_codebase};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_report_mirrors_the_scan_result() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.py"), "print(1)").unwrap();
        fs::write(tmp.path().join("b.rs"), "fn main() {}").unwrap();

        let scan = scan_codebase(tmp.path(), &ScanConfig::default()).unwrap();
        let report = build_scan_report("root", &scan);

        assert_eq!(report.total_files, 2);
        assert_eq!(report.files[0].path, "a.py");
        assert_eq!(report.files[0].language, "Python");
        assert_eq!(report.files[1].language, "Rust");
        assert_eq!(
            report.total_bytes,
            ("print(1)".len() + "fn main() {}".len()) as u64
        );
    }

    #[test]
    fn quiet_suppresses_the_table_but_not_json() {
        let report = build_scan_report("root", &ScanResult::default());

        assert!(render_scan_output(&report, None, true).unwrap().is_none());

        let json = render_scan_output(&report, Some("json"), true)
            .unwrap()
            .unwrap();
        assert!(json.contains("\"total_files\": 0"));
    }

    #[test]
    fn empty_scan_prints_a_notice_instead_of_a_table() {
        let report = build_scan_report("root", &ScanResult::default());
        let output = render_scan_output(&report, None, false).unwrap().unwrap();
        assert_eq!(output, "No analyzable source files found.");
    }

    #[test]
    fn skip_reason_serializes_kebab_case() {
        let row = SkipRow {
            path: "big.go".to_string(),
            reason: core::SkipReason::TooLarge,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"too-large\""));
    }
}
