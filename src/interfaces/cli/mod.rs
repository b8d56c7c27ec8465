use crate::domain::app_config::{CsvLayout, ExportFormat};
use crate::infrastructure::config::ConfigOverrides;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT: &str = "generated_test_cases.csv";
pub const DEFAULT_LOG_FILE: &str = "test_case_generation.log";

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    Csv,
    Json,
}

impl From<CliFormat> for ExportFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Csv => ExportFormat::Csv,
            CliFormat::Json => ExportFormat::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum CliCsvLayout {
    /// One row per test step
    RowPerStep,
    /// One row per test case, steps joined by newlines
    Concatenated,
}

impl From<CliCsvLayout> for CsvLayout {
    fn from(layout: CliCsvLayout) -> Self {
        match layout {
            CliCsvLayout::RowPerStep => CsvLayout::RowPerStep,
            CliCsvLayout::Concatenated => CsvLayout::Concatenated,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "swagger-casegen",
    about = "Generate positive and negative API test cases from a Swagger/OpenAPI specification",
    version
)]
pub struct Cli {
    /// Specification file (.json, .yaml, .yml) or http(s) URL
    pub spec: String,

    /// Output file
    #[arg(default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Output format (the output extension wins when it disagrees)
    #[arg(long, value_enum)]
    pub format: Option<CliFormat>,

    /// YAML or TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// API key for the model endpoint
    #[arg(long)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long)]
    pub llm_url: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Parallel model requests (0 = unlimited)
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Read completions as a token stream
    #[arg(long)]
    pub stream: bool,

    /// Request schema-constrained JSON output
    #[arg(long)]
    pub structured_output: bool,

    /// Keep duplicate test cases
    #[arg(long)]
    pub no_dedup: bool,

    #[arg(long, value_enum)]
    pub csv_layout: Option<CliCsvLayout>,

    /// Write the run manifest as JSON to this path
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Log file (ANSI-free copy of the console log)
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log to the console only
    #[arg(long)]
    pub no_log_file: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            base_url: self.llm_url.clone(),
            model: self.model.clone(),
            max_concurrent: self.max_concurrent,
            streaming: self.stream,
            structured_output: self.structured_output,
            no_dedup: self.no_dedup,
            format: self.format.map(ExportFormat::from),
            csv_layout: self.csv_layout.map(CsvLayout::from),
        }
    }

    pub fn log_file(&self) -> Option<&PathBuf> {
        (!self.no_log_file).then_some(&self.log_file)
    }
}
