use crate::domain::model::RunReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

/// Drives the three pipeline stages in order and reports what happened.
pub struct ExtractionEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ExtractionEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Reading input table...");
        let rows = self.pipeline.extract().await?;
        tracing::info!("Loaded {} rows", rows.len());

        tracing::info!("Classifying clinical notes...");
        let result = self.pipeline.transform(rows).await?;
        let (processed, skipped, failed) = (result.records.len(), result.skipped, result.failed);
        tracing::info!(
            "Tabulated {} notes ({} skipped, {} failed)",
            processed,
            skipped,
            failed
        );

        tracing::info!("Writing output...");
        let output_path = self.pipeline.load(result).await?;

        Ok(RunReport {
            processed,
            skipped,
            failed,
            output_path,
        })
    }
}
