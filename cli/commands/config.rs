use crate::cli_args::ConfigArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use log;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use codesage_core::{AppError, Config, config::DEFAULT_CONFIG_DIR, config::DEFAULT_CONFIG_FILENAME};

pub fn handle_config_command(args: &ConfigArgs, quiet: bool) -> Result<()> {
    let default_toml = Config::default_toml().context("Failed to render default configuration")?;

    if !args.save {
        print!("{}", default_toml);
        return Ok(());
    }

    let cwd = env::current_dir().context("Failed to determine current directory")?;
    let config_dir = cwd.join(DEFAULT_CONFIG_DIR);
    fs::create_dir_all(&config_dir).map_err(|e| AppError::DirCreation {
        path: config_dir.clone(),
        source: e,
    })?;

    let config_path = config_dir.join(DEFAULT_CONFIG_FILENAME);
    log::debug!("Saving default config to: {}", config_path.display());

    // Refuse to clobber an existing config.
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&config_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                anyhow::Error::from(AppError::Config(format!(
                    "Config file already exists at {}. Remove it first to regenerate.",
                    config_path.display()
                )))
            } else {
                anyhow::Error::from(AppError::FileWrite {
                    path: config_path.clone(),
                    source: e,
                })
            }
        })?;
    file.write_all(default_toml.as_bytes())
        .map_err(|e| AppError::FileWrite {
            path: config_path.clone(),
            source: e,
        })?;

    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            config_path.display().to_string().blue()
        );
    }
    Ok(())
}
