pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod report;
pub mod scan;

pub use client::{AnalysisBackend, GeminiClient, SYSTEM_INSTRUCTION};
pub use config::{AnalysisConfig, ApiKey, Config, PromptConfig, ReportConfig, ScanConfig};
pub use error::{AppError, Result};
pub use prompt::{Payload, assemble_payload, language_from_extension};
pub use report::{AnalysisReport, RunSummary, write_report};
pub use scan::{ScanResult, SkipReason, SkippedFile, SourceFile, scan_codebase};
