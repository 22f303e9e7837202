use crate::core::{classify, convert};
use crate::domain::model::{Record, TabulationResult};
use crate::domain::ports::{Classifier, ConfigProvider, Pipeline, Storage};
use crate::utils::error::{Result, TabuladorError};
use serde_json::{Map, Value};
use std::path::Path;

/// Column that must carry the free-text clinical note.
pub const NOTE_COLUMN: &str = "obs";

/// Notes shorter than this (trimmed) are not worth a service call.
const MIN_NOTE_CHARS: usize = 10;

pub struct ClassificationPipeline<S: Storage, C: Classifier, P: ConfigProvider> {
    storage: S,
    classifier: C,
    config: P,
}

impl<S: Storage, C: Classifier, P: ConfigProvider> ClassificationPipeline<S, C, P> {
    pub fn new(storage: S, classifier: C, config: P) -> Self {
        Self {
            storage,
            classifier,
            config,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: Classifier, P: ConfigProvider> Pipeline for ClassificationPipeline<S, C, P> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::debug!("Reading input table: {}", self.config.input_path());
        let bytes = self.storage.read_file(self.config.input_path()).await?;

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers()?.clone();
        if !headers.iter().any(|header| header == NOTE_COLUMN) {
            return Err(TabuladorError::SchemaError {
                column: NOTE_COLUMN.to_string(),
            });
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut data = Map::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                data.insert(header.to_string(), cell_value(cell));
            }
            records.push(Record { data });
        }

        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TabulationResult> {
        let total = data.len();
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for (index, mut row) in data.into_iter().enumerate() {
            let texto = note_text(row.data.get(NOTE_COLUMN));
            if texto.trim().chars().count() < MIN_NOTE_CHARS {
                tracing::debug!(
                    "row {}/{}: note below length threshold, skipped",
                    index + 1,
                    total
                );
                skipped += 1;
                continue;
            }

            let extraction = classify::classify_note(&self.classifier, &texto).await;
            if extraction.is_failed() {
                failed += 1;
            }
            row.merge(extraction.into_fields());
            records.push(row);
            tracing::debug!("row {}/{} classified", index + 1, total);
        }

        Ok(TabulationResult {
            records,
            skipped,
            failed,
        })
    }

    async fn load(&self, result: TabulationResult) -> Result<String> {
        let output_path = self.config.output_path();

        let json = serde_json::to_string_pretty(&result.records)?;
        self.storage
            .write_file(output_path, json.as_bytes())
            .await?;
        tracing::debug!("JSON artifact saved to: {}", output_path);

        if self.config.emit_csv() {
            let csv_path = sibling_csv_path(output_path);
            let bytes = convert::records_to_csv(&result.records)?;
            self.storage.write_file(&csv_path, &bytes).await?;
            tracing::info!("CSV artifact saved to: {}", csv_path);
        }

        Ok(output_path.to_string())
    }
}

/// Empty cells stay null until the classifier stage normalizes them; cells
/// that read as numbers are kept numeric, everything else stays text.
fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}

fn note_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn sibling_csv_path(output_path: &str) -> String {
    Path::new(output_path)
        .with_extension("csv")
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put_file(&self, path: &str, data: &[u8]) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                TabuladorError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    /// Returns one scripted response (or failure) per call, in order.
    struct ScriptedClassifier {
        responses: StdMutex<VecDeque<std::result::Result<String, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedClassifier {
        fn new(responses: Vec<std::result::Result<String, String>>) -> Self {
            Self {
                responses: StdMutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .expect("no scripted response left");
            next.map_err(|message| TabuladorError::ProcessingError { message })
        }
    }

    struct MockConfig {
        input_path: String,
        output_path: String,
        emit_csv: bool,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                input_path: "notas.csv".to_string(),
                output_path: "saida.json".to_string(),
                emit_csv: false,
            }
        }

        fn with_csv(mut self) -> Self {
            self.emit_csv = true;
            self
        }
    }

    impl ConfigProvider for MockConfig {
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

    fn pipeline_with(
        storage: MockStorage,
        responses: Vec<std::result::Result<String, String>>,
        config: MockConfig,
    ) -> ClassificationPipeline<MockStorage, ScriptedClassifier, MockConfig> {
        ClassificationPipeline::new(storage, ScriptedClassifier::new(responses), config)
    }

    #[tokio::test]
    async fn extract_preserves_column_order_and_nulls() {
        let storage = MockStorage::new();
        storage
            .put_file("notas.csv", b"id,leito,obs\n1,12A,Paciente estavel\n2,,\n")
            .await;

        let pipeline = pipeline_with(storage, vec![], MockConfig::new());
        let rows = pipeline.extract().await.unwrap();

        assert_eq!(rows.len(), 2);
        let keys: Vec<&str> = rows[0].data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "leito", "obs"]);
        assert_eq!(rows[0].data["id"], 1);
        assert_eq!(rows[0].data["obs"], "Paciente estavel");
        assert_eq!(rows[1].data["leito"], Value::Null);
        assert_eq!(rows[1].data["obs"], Value::Null);
    }

    #[tokio::test]
    async fn extract_fails_without_note_column() {
        let storage = MockStorage::new();
        storage
            .put_file("notas.csv", b"id,texto\n1,Paciente hipertenso\n")
            .await;

        let pipeline = pipeline_with(storage, vec![], MockConfig::new());
        let err = pipeline.extract().await.unwrap_err();

        match err {
            TabuladorError::SchemaError { column } => assert_eq!(column, "obs"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn transform_repairs_partial_classification() {
        let storage = MockStorage::new();
        storage
            .put_file("notas.csv", b"id,obs\n1,Paciente hipertenso com febre\n")
            .await;

        let pipeline = pipeline_with(
            storage,
            vec![Ok(r#"{"comorbidades":["HAS"],"sintomas":["Febre"]}"#.to_string())],
            MockConfig::new(),
        );
        let rows = pipeline.extract().await.unwrap();
        let result = pipeline.transform(rows).await.unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.failed, 0);

        let record = &result.records[0].data;
        assert_eq!(record["comorbidades"], serde_json::json!(["HAS"]));
        assert_eq!(record["sintomas"], serde_json::json!(["Febre"]));
        assert_eq!(record["motivo_internacao"], serde_json::json!(["outros"]));
        assert_eq!(record["medicamentos_continuos"], serde_json::json!([]));
        assert_eq!(record["achados_exame_fisico"], serde_json::json!([]));
        // original columns survive the merge
        assert_eq!(record["id"], 1);
        assert_eq!(record["obs"], "Paciente hipertenso com febre");
    }

    #[tokio::test]
    async fn transform_skips_short_notes_without_calling_service() {
        let storage = MockStorage::new();
        storage
            .put_file("notas.csv", b"id,obs\n1,ok\n2,\n3,   curto   \n")
            .await;

        let pipeline = pipeline_with(storage, vec![], MockConfig::new());
        let rows = pipeline.extract().await.unwrap();
        let result = pipeline.transform(rows).await.unwrap();

        assert!(result.records.is_empty());
        assert_eq!(result.skipped, 3);
        assert_eq!(pipeline.classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn transform_processes_exactly_threshold_length_note() {
        let storage = MockStorage::new();
        // "123456789" trims to 9 chars, "1234567890" to 10
        storage
            .put_file("notas.csv", b"obs\n123456789\n1234567890\n")
            .await;

        let pipeline = pipeline_with(storage, vec![Ok("{}".to_string())], MockConfig::new());
        let rows = pipeline.extract().await.unwrap();
        let result = pipeline.transform(rows).await.unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(pipeline.classifier.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_row_stays_in_result_with_error_fields() {
        let storage = MockStorage::new();
        storage
            .put_file(
                "notas.csv",
                b"id,obs\n1,Paciente com dispneia aos esforcos\n2,Paciente diabetico em uso de insulina\n",
            )
            .await;

        let pipeline = pipeline_with(
            storage,
            vec![
                Err("connection reset by peer".to_string()),
                Ok(r#"{"comorbidades":["DM"],"medicamentos_continuos":["Insulina"]}"#.to_string()),
            ],
            MockConfig::new(),
        );
        let rows = pipeline.extract().await.unwrap();
        let result = pipeline.transform(rows).await.unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.failed, 1);

        let errored = &result.records[0].data;
        assert_eq!(errored["id"], 1);
        assert!(errored["erro"]
            .as_str()
            .unwrap()
            .contains("connection reset by peer"));
        assert_eq!(errored["obs"], "Paciente com dispneia aos esforcos");
        assert!(!errored.contains_key("comorbidades"));

        // input order is preserved across mixed outcomes
        let classified = &result.records[1].data;
        assert_eq!(classified["id"], 2);
        assert_eq!(classified["comorbidades"], serde_json::json!(["DM"]));
        assert!(!classified.contains_key("erro"));
    }

    #[tokio::test]
    async fn load_writes_readable_json() {
        let storage = MockStorage::new();
        storage
            .put_file("notas.csv", b"id,obs\n1,Paciente com edema e oliguria\n")
            .await;

        let pipeline = pipeline_with(
            storage.clone(),
            vec![Ok(r#"{"sintomas":["Edema","Oligúria"]}"#.to_string())],
            MockConfig::new(),
        );
        let rows = pipeline.extract().await.unwrap();
        let result = pipeline.transform(rows).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(output_path, "saida.json");
        let json_bytes = storage.get_file("saida.json").await.unwrap();
        let text = String::from_utf8(json_bytes).unwrap();

        // human-readable indentation, non-ASCII preserved literally
        assert!(text.starts_with("[\n"));
        assert!(text.contains("Oligúria"));
        assert!(!text.contains("\\u"));

        // round-trip: parsing the artifact yields the same records
        let reparsed: Vec<Record> = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed.len(), 1);
        assert_eq!(
            reparsed[0].data["sintomas"],
            serde_json::json!(["Edema", "Oligúria"])
        );
        assert_eq!(
            reparsed[0].data["motivo_internacao"],
            serde_json::json!(["outros"])
        );
    }

    #[tokio::test]
    async fn load_emits_csv_twin_when_enabled() {
        let storage = MockStorage::new();
        storage
            .put_file(
                "notas.csv",
                b"id,obs\n1,Paciente taquipneico em ar ambiente\n",
            )
            .await;

        let pipeline = pipeline_with(
            storage.clone(),
            vec![Ok(r#"{"achados_exame_fisico":["Taquipneico"]}"#.to_string())],
            MockConfig::new().with_csv(),
        );
        let rows = pipeline.extract().await.unwrap();
        let result = pipeline.transform(rows).await.unwrap();
        pipeline.load(result).await.unwrap();

        let csv_bytes = storage.get_file("saida.csv").await.unwrap();
        assert_eq!(&csv_bytes[..3], [0xEF, 0xBB, 0xBF]);

        let text = String::from_utf8(csv_bytes[3..].to_vec()).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("id,obs,comorbidades"));
        assert!(text.contains(r#"[""Taquipneico""]"#));

        // JSON twin is produced from the same result set
        assert!(storage.get_file("saida.json").await.is_some());
    }

    #[test]
    fn cell_value_inference() {
        assert_eq!(cell_value(""), Value::Null);
        assert_eq!(cell_value("42"), 42);
        assert_eq!(cell_value("36.7"), 36.7);
        assert_eq!(cell_value("12A"), "12A");
    }

    #[test]
    fn note_text_normalizes_nulls_and_numbers() {
        assert_eq!(note_text(None), "");
        assert_eq!(note_text(Some(&Value::Null)), "");
        assert_eq!(note_text(Some(&Value::String("texto".into()))), "texto");
        assert_eq!(note_text(Some(&serde_json::json!(123))), "123");
    }

    #[test]
    fn csv_path_swaps_extension() {
        assert_eq!(
            sibling_csv_path("saida/evolucoes.json"),
            "saida/evolucoes.csv"
        );
    }
}
