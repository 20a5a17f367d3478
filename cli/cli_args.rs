use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ProjectOpts {
    #[arg(
        help = "Path to the directory containing source code to analyze.",
        value_name = "PATH"
    )]
    pub path: PathBuf,

    #[arg(
        long,
        help = "Specify path of the TOML config file (default: <PATH>/.codesage/codesage.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "AI-powered code analysis tool using Google Gemini.",
    long_about = "codesage walks a codebase, concatenates its source files into a bounded \nprompt and asks the Gemini API for architectural suggestions. The response \nis written to a timestamped report file.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  codesage analyze ./backend\n  codesage analyze ~/my-project -o reports --model gemini-2.5-flash\n  codesage scan ./src -f json\n  codesage config --save\n\nENVIRONMENT:\n  GEMINI_API_KEY   API key from Google AI Studio (a .env file is also read).",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "a",
        about = "Analyze a codebase with the AI backend and write a report."
    )]
    Analyze(AnalyzeArgs),

    #[command(
        visible_alias = "s",
        about = "List the files a run would analyze, without calling the network."
    )]
    Scan(ScanArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Directory for the report file [default: analysis_output].",
        help_heading = "Output Control"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        long,
        help = "Also print the suggestions to standard output.",
        help_heading = "Output Control"
    )]
    pub stdout: bool,

    #[arg(
        long,
        value_name = "MODEL",
        help = "Gemini model to use [default: gemini-2.5-pro].",
        help_heading = "Analysis Backend"
    )]
    pub model: Option<String>,

    #[arg(
        long,
        value_name = "DURATION",
        help = "Request timeout, e.g. '120s', '2m'.",
        help_heading = "Analysis Backend"
    )]
    pub timeout: Option<String>,

    #[arg(
        long,
        help = "Probe the API key with a small request before scanning.",
        help_heading = "Analysis Backend"
    )]
    pub check_key: bool,

    #[arg(
        long,
        value_name = "SIZE",
        help = "Per-file size ceiling, e.g. '1 MiB'.",
        help_heading = "Limits"
    )]
    pub max_file_size: Option<String>,

    #[arg(
        long,
        value_name = "SIZE",
        help = "Total prompt payload budget, e.g. '4 MiB'.",
        help_heading = "Limits"
    )]
    pub max_payload_size: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,

    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["table", "json"], help_heading = "Output Formatting")]
    pub format: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Save default config structure to .codesage/codesage.toml (fails if present)."
    )]
    pub save: bool,
}
