//! Per-note classification: one service call, then response cleanup.
//!
//! A response is accepted only after passing through `parse_response`, which
//! strips stray code fences and fills in omitted keys. Any failure along the
//! way — transport, HTTP status, malformed JSON — degrades to
//! `Extraction::Failed` so the row stays in the output as an audit record.

use crate::core::prompt;
use crate::domain::model::{Classification, Extraction};
use crate::domain::ports::Classifier;
use crate::utils::error::Result;

pub async fn classify_note<C: Classifier>(classifier: &C, texto: &str) -> Extraction {
    match request_classification(classifier, texto).await {
        Ok(classification) => Extraction::Classified(classification),
        Err(e) => {
            tracing::warn!("classification failed, keeping row as error record: {e}");
            Extraction::Failed {
                erro: e.to_string(),
                obs: texto.to_string(),
            }
        }
    }
}

async fn request_classification<C: Classifier>(
    classifier: &C,
    texto: &str,
) -> Result<Classification> {
    let raw = classifier.classify(&prompt::compose(texto)).await?;
    parse_response(&raw)
}

/// Parse a raw service response into a schema-complete classification.
pub fn parse_response(raw: &str) -> Result<Classification> {
    let cleaned = strip_code_fences(raw);
    let mut classification: Classification = serde_json::from_str(cleaned)?;
    classification.repair();
    Ok(classification)
}

/// Drop surrounding backtick fences, with or without a language tag. The
/// contract forbids them, but models add them anyway.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
