use crate::cli_args::AnalyzeArgs;
use crate::load_config_for_command;
use anyhow::{Context, Result};
use colored::Colorize;
use log;
use std::path::{Path, PathBuf};
use codesage_core::{
    self as core, AnalysisBackend, AnalysisReport, ApiKey, Config, GeminiClient, RunSummary,
};

pub fn handle_analyze_command(args: AnalyzeArgs, quiet: bool) -> Result<()> {
    analyze_with_credential(args, quiet, ApiKey::from_env(), core::scan_codebase)
}

fn analyze_with_credential<C>(
    args: AnalyzeArgs,
    quiet: bool,
    credential: core::Result<ApiKey>,
    collect: C,
) -> Result<()>
where
    C: Fn(&Path, &core::ScanConfig) -> core::Result<core::ScanResult>,
{
    // The credential is a startup precondition: resolve it before touching
    // the filesystem so a missing key never triggers a scan.
    let api_key = credential.context("Failed to load API credential")?;

    let root = Config::resolve_root(&args.project.path)
        .context("Failed to resolve target directory")?;
    log::info!("Target directory resolved: {}", root.display());

    let config = load_config_for_command(&root, &args.project, Some(&args))
        .context("Failed to load configuration")?;

    let backend =
        GeminiClient::new(&config.analysis, api_key).context("Failed to create analysis client")?;

    if args.check_key {
        log::info!("Probing API key...");
        backend
            .validate_key()
            .context("API key validation request failed")?;
        if !quiet {
            println!("{} API key is valid.", "✅".green());
        }
    }

    let report_path = run_analysis(&root, &config, collect, &backend, quiet, args.stdout)?;
    if !quiet {
        println!(
            "{} Analysis saved to: {}",
            "✅".green(),
            report_path.display().to_string().blue()
        );
    }
    Ok(())
}

/// The full pipeline: scan, assemble, send, write. The collector and the
/// backend are both injectable, so the whole run is exercisable without
/// filesystem surprises or network access.
pub fn run_analysis<C>(
    root: &Path,
    config: &Config,
    collect: C,
    backend: &dyn AnalysisBackend,
    quiet: bool,
    to_stdout: bool,
) -> Result<PathBuf>
where
    C: Fn(&Path, &core::ScanConfig) -> core::Result<core::ScanResult>,
{
    log::info!("Starting analysis for: {}", root.display());

    let scan = collect(root, &config.scan)
        .context("Failed to scan the target directory")?;
    if scan.files.is_empty() {
        anyhow::bail!(core::AppError::InvalidArgument(format!(
            "No analyzable source files found under '{}'. Check the directory path.",
            root.display()
        )));
    }
    if !quiet {
        println!(
            "Found {} source files ({} skipped).",
            scan.files.len().to_string().cyan(),
            scan.skipped.len()
        );
        for skipped in &scan.skipped {
            eprintln!(
                "{} Skipping {}: {}",
                "⚠️".yellow(),
                skipped.path.display(),
                skipped.reason
            );
        }
    }

    let budget = config
        .prompt
        .max_payload_size_bytes()
        .context("Invalid payload budget")?;
    let payload = core::assemble_payload(&scan, budget);
    if payload.omitted > 0 && !quiet {
        eprintln!(
            "{} Payload budget reached: {} files omitted from the prompt.",
            "⚠️".yellow(),
            payload.omitted
        );
    }

    if !quiet {
        println!("Analyzing codebase with model '{}'...", config.analysis.model);
    }
    let suggestions = backend
        .send(&payload.text)
        .context("Analysis request failed")?;

    if to_stdout {
        println!("{}", suggestions);
    }

    let summary = RunSummary {
        files_analyzed: payload.included,
        files_skipped: scan.skipped.len(),
        files_omitted: payload.omitted,
    };
    let report = AnalysisReport::new(root.to_path_buf(), suggestions, summary);
    let report_path = core::write_report(&report, &config.report.output_dir)
        .context("Failed to write the analysis report")?;

    Ok(report_path)
}
