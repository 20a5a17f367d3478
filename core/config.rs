use crate::error::{AppError, Result};
use byte_unit::Byte;
use log;
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".codesage";
pub const DEFAULT_CONFIG_FILENAME: &str = "codesage.toml";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_MAX_FILE_SIZE: &str = "1 MiB";
pub const DEFAULT_MAX_PAYLOAD_SIZE: &str = "4 MiB";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "120s";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Directory names pruned from traversal at any depth.
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
    /// Extension allow-list (leading dot, case-insensitive).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Extra root-relative glob patterns to exclude.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Per-file size ceiling as a byte-unit string, e.g. "1 MiB".
    #[serde(default = "default_max_file_size")]
    pub max_file_size: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    /// Total payload budget as a byte-unit string, e.g. "4 MiB".
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_probe_model")]
    pub probe_model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout as a duration string, e.g. "120s".
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_ignore_dirs() -> Vec<String> {
    [
        "__pycache__",
        ".venv",
        "venv",
        ".env",
        ".git",
        "node_modules",
        ".next",
        "dist",
        "build",
        "target",
        ".gradle",
        ".idea",
        ".vscode",
        ".pytest_cache",
        ".mypy_cache",
        ".tox",
        "htmlcov",
        ".coverage",
        ".DS_Store",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_extensions() -> Vec<String> {
    [
        ".py", ".js", ".jsx", ".ts", ".tsx", ".go", ".java", ".cs", ".cpp", ".c", ".rb", ".rs",
        ".php", ".kt", ".swift", ".scala",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_file_size() -> String {
    DEFAULT_MAX_FILE_SIZE.to_string()
}
fn default_max_payload_size() -> String {
    DEFAULT_MAX_PAYLOAD_SIZE.to_string()
}
fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}
fn default_probe_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout() -> String {
    DEFAULT_REQUEST_TIMEOUT.to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("analysis_output")
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: default_ignore_dirs(),
            extensions: default_extensions(),
            exclude: Vec::new(),
            max_file_size: default_max_file_size(),
        }
    }
}
impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_payload_size: default_max_payload_size(),
        }
    }
}
impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            probe_model: default_probe_model(),
            base_url: default_base_url(),
            timeout: default_timeout(),
            temperature: default_temperature(),
        }
    }
}
impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl ScanConfig {
    pub fn max_file_size_bytes(&self) -> Result<u64> {
        parse_byte_size(&self.max_file_size)
    }
}

impl PromptConfig {
    pub fn max_payload_size_bytes(&self) -> Result<usize> {
        let bytes = parse_byte_size(&self.max_payload_size)?;
        usize::try_from(bytes).map_err(|_| {
            AppError::InvalidArgument(format!(
                "Payload budget '{}' exceeds the addressable size on this platform",
                self.max_payload_size
            ))
        })
    }
}

impl AnalysisConfig {
    pub fn request_timeout(&self) -> Result<Duration> {
        parse(&self.timeout).map_err(|e| {
            AppError::InvalidArgument(format!(
                "Invalid timeout duration '{}': {}. Use format like '30s', '2m'.",
                self.timeout, e
            ))
        })
    }
}

fn parse_byte_size(size_str: &str) -> Result<u64> {
    let byte_value = Byte::from_str(size_str).map_err(|e| {
        AppError::InvalidArgument(format!(
            "Invalid size format '{}': {}. Use KB, MiB, etc.",
            size_str, e
        ))
    })?;
    Ok(byte_value.as_u64())
}

impl Config {
    /// Resolve and validate the target root directory supplied on the CLI.
    pub fn resolve_root(cli_path: &Path) -> Result<PathBuf> {
        let expanded = shellexpand::tilde(&cli_path.to_string_lossy()).to_string();
        let path = PathBuf::from(expanded);

        if !path.exists() {
            return Err(AppError::RootNotFound(path));
        }
        if !path.is_dir() {
            return Err(AppError::NotADirectory(path));
        }

        path.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to canonicalize root '{}': {}", path.display(), e),
            ))
        })
    }

    pub fn resolve_config_path(
        root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p_str) => {
                let expanded = shellexpand::tilde(p_str);
                let path = PathBuf::from(expanded.as_ref());
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let default_path = root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        toml::from_str::<Config>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    /// The default configuration rendered as TOML, for `codesage config`.
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Config::default())?)
    }
}

/// The AI backend credential, read once at startup and immutable thereafter.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn from_env() -> Result<Self> {
        Self::from_env_var(API_KEY_ENV)
    }

    pub fn from_env_var(var: &str) -> Result<Self> {
        match env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(ApiKey(value.trim().to_string())),
            _ => Err(AppError::Config(format!(
                "{} not found in environment. Create a .env file or export the variable \
                 with your Gemini API key from Google AI Studio.",
                var
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never echo the credential into logs.
        f.write_str("ApiKey(***)")
    }
}
