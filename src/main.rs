use clap::Parser;
use tabulador::config::{self, file::FileConfig};
use tabulador::utils::{logger, validation, validation::Validate};
use tabulador::{
    ApiConfig, ClassificationPipeline, Cli, Command, ConvertArgs, ExtractionEngine, LocalStorage,
    OpenAiClassifier, RunConfig, TabulateArgs,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting tabulador");

    let outcome = match &cli.command {
        Command::Tabulate(args) => run_tabulate(args).await,
        Command::Convert(args) => run_convert(args).await,
    };

    if let Err(e) = outcome {
        tracing::error!("❌ Run failed: {}", e);
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run_tabulate(args: &TabulateArgs) -> tabulador::Result<()> {
    // Credential acquisition stays at the entry point; the pipeline only ever
    // sees the resolved ApiConfig.
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

    let settings = FileConfig::load(args.config.as_deref())?;
    let api_config = ApiConfig::resolve(args, &settings, api_key);
    api_config.validate()?;

    let run_config = RunConfig::from_args(args);
    run_config.validate()?;
    tracing::debug!("Run config: {:?}", run_config);

    let storage = LocalStorage::new();
    let classifier = OpenAiClassifier::new(api_config)?;
    let pipeline = ClassificationPipeline::new(storage, classifier, run_config);
    let engine = ExtractionEngine::new(pipeline);

    let report = engine.run().await?;

    tracing::info!("✅ Tabulation completed successfully!");
    println!(
        "✅ Done: {} notes processed ({} skipped, {} failed).",
        report.processed, report.skipped, report.failed
    );
    println!("📁 Output saved to: {}", report.output_path);

    Ok(())
}

async fn run_convert(args: &ConvertArgs) -> tabulador::Result<()> {
    validation::validate_path("input", &args.input)?;
    validation::validate_extension("input", &args.input, &["json"])?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(config::default_convert_output);

    let storage = LocalStorage::new();
    let rows = tabulador::json_to_csv(&storage, &args.input, &output_path).await?;

    tracing::info!("✅ Conversion completed successfully!");
    println!("✅ Done: {} rows converted.", rows);
    println!("📁 Output saved to: {}", output_path);

    Ok(())
}
