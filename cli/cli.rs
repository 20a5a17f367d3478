mod cli_args;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::process;

use cli_args::{AnalyzeArgs, Cli, Commands, ProjectOpts};
use codesage_core::{AppError, Config};

fn main() {
    // Pick up GEMINI_API_KEY from a .env file if one is present.
    dotenvy::dotenv().ok();

    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let core_err = e.downcast_ref::<AppError>();
            let exit_code = match core_err {
                Some(AppError::Config(_)) => 1,
                Some(AppError::RootNotFound(_)) => 1,
                Some(AppError::NotADirectory(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::DirCreation { .. }) => 2,
                Some(AppError::Glob(_)) => 2,
                Some(AppError::Network(_)) => 3,
                Some(AppError::Api(_)) => 3,
                Some(AppError::Timeout(_)) => 4,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(AppError::TomlSerialize(_)) => 6,
                Some(AppError::JsonSerialize(_)) => 6,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Analyze(args) => {
                log::debug!("Executing 'analyze' command...");
                commands::analyze::handle_analyze_command(args, quiet)?;
            }
            Commands::Scan(args) => {
                log::debug!("Executing 'scan' command...");
                commands::scan::handle_scan_command(args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                commands::config::handle_config_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

fn merge_config_with_cli_overrides(mut config: Config, args: &AnalyzeArgs) -> Config {
    log::trace!("Applying analyze command CLI overrides to config...");

    if let Some(output_dir) = &args.output_dir {
        config.report.output_dir = output_dir.clone();
    }
    if let Some(model) = &args.model {
        config.analysis.model = model.clone();
    }
    if let Some(timeout) = &args.timeout {
        config.analysis.timeout = timeout.clone();
    }
    if let Some(max_file_size) = &args.max_file_size {
        config.scan.max_file_size = max_file_size.clone();
    }
    if let Some(max_payload_size) = &args.max_payload_size {
        config.prompt.max_payload_size = max_payload_size.clone();
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

// Helper function to load config considering CLI options.
// Kept public as it's used by multiple command modules.
pub fn load_config_for_command(
    root: &std::path::Path,
    project_opts: &ProjectOpts,
    analyze_args: Option<&AnalyzeArgs>,
) -> Result<Config> {
    use anyhow::Context;

    let config_path = Config::resolve_config_path(
        root,
        project_opts.config_file.as_ref(),
        project_opts.disable_config,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(args) = analyze_args {
        config = merge_config_with_cli_overrides(config, args);
    }

    Ok(config)
}
