pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, ApiConfig, Cli, Command, ConvertArgs, RunConfig, TabulateArgs};
pub use core::{
    convert::json_to_csv, engine::ExtractionEngine, openai::OpenAiClassifier,
    pipeline::ClassificationPipeline,
};
pub use utils::error::{Result, TabuladorError};
