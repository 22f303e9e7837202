pub mod cli;
pub mod file;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, TabuladorError};
use crate::utils::validation::{self, Validate};
use crate::config::file::FileConfig;
use chrono::Local;
use clap::{Args, Parser, Subcommand};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Parser)]
#[command(name = "tabulador")]
#[command(about = "Tabulates free-text clinical notes into structured JSON/CSV")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify the notes in a CSV table and write a JSON artifact
    Tabulate(TabulateArgs),
    /// Convert a tabulated JSON artifact back into a CSV table
    Convert(ConvertArgs),
}

#[derive(Debug, Args)]
pub struct TabulateArgs {
    /// Input CSV with an 'obs' column holding the clinical notes
    pub input: String,

    /// Output JSON path (default: evolucoes_tabuladas_<timestamp>.json)
    #[arg(long)]
    pub output: Option<String>,

    /// Also write a CSV twin next to the JSON artifact
    #[arg(long)]
    pub csv: bool,

    /// TOML settings file with an [api] section
    #[arg(long)]
    pub config: Option<String>,

    /// Model identifier sent to the classification service
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the classification service
    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// Sampling temperature for the classification call
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input JSON artifact (a list of objects)
    pub input: String,

    /// Output CSV path (default: json_convertido_<timestamp>.csv)
    #[arg(long)]
    pub output: Option<String>,
}

/// Everything the classification service adapter needs, resolved once by the
/// entry point and passed in explicitly.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Flags win over the settings file, which wins over defaults. The
    /// credential is acquired by the caller, never read here.
    pub fn resolve(args: &TabulateArgs, settings: &FileConfig, api_key: String) -> Self {
        let api = settings.api.clone().unwrap_or_default();
        Self {
            api_key,
            endpoint: args
                .api_endpoint
                .clone()
                .or(api.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: args
                .model
                .clone()
                .or(api.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: args
                .temperature
                .or(api.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            timeout_secs: args.timeout.or(api.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Validate for ApiConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(TabuladorError::MissingConfigError {
                field: "OPENAI_API_KEY".to_string(),
            });
        }
        validation::validate_url("api_endpoint", &self.endpoint)?;
        validation::validate_range("temperature", self.temperature, 0.0, 2.0)?;
        validation::validate_positive_number("timeout_secs", self.timeout_secs as usize, 1)?;
        Ok(())
    }
}

/// Paths and artifact switches for one tabulation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_path: String,
    pub output_path: String,
    pub emit_csv: bool,
}

impl RunConfig {
    pub fn from_args(args: &TabulateArgs) -> Self {
        Self {
            input_path: args.input.clone(),
            output_path: args.output.clone().unwrap_or_else(default_tabulate_output),
            emit_csv: args.csv,
        }
    }
}

impl ConfigProvider for RunConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn emit_csv(&self) -> bool {
        self.emit_csv
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input_path)?;
        validation::validate_extension("input", &self.input_path, &["csv"])?;
        validation::validate_path("output", &self.output_path)?;
        Ok(())
    }
}

fn default_tabulate_output() -> String {
    format!(
        "evolucoes_tabuladas_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

pub fn default_convert_output() -> String {
    format!(
        "json_convertido_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}
