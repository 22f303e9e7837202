use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of the source table, keyed by column name in source order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    /// Merge extra fields into the record. Same-named fields are overwritten
    /// while keeping their original column position.
    pub fn merge(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            self.data.insert(key, value);
        }
    }
}

fn motivo_fallback() -> Vec<String> {
    vec!["outros".to_string()]
}

/// Structured categories extracted from one clinical note.
///
/// Deserialization doubles as schema repair: keys the service omitted come
/// back as empty lists, except `motivo_internacao` which falls back to
/// `["outros"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub comorbidades: Vec<String>,
    #[serde(default = "motivo_fallback")]
    pub motivo_internacao: Vec<String>,
    #[serde(default)]
    pub medicamentos_continuos: Vec<String>,
    #[serde(default)]
    pub sintomas: Vec<String>,
    #[serde(default)]
    pub achados_exame_fisico: Vec<String>,
}

impl Classification {
    /// Normalize an already-parsed classification. `motivo_internacao` must
    /// never be empty, even when the service sent an explicit empty list.
    /// Idempotent.
    pub fn repair(&mut self) {
        if self.motivo_internacao.is_empty() {
            self.motivo_internacao = motivo_fallback();
        }
    }

    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("comorbidades".to_string(), string_list(self.comorbidades));
        fields.insert(
            "motivo_internacao".to_string(),
            string_list(self.motivo_internacao),
        );
        fields.insert(
            "medicamentos_continuos".to_string(),
            string_list(self.medicamentos_continuos),
        );
        fields.insert("sintomas".to_string(), string_list(self.sintomas));
        fields.insert(
            "achados_exame_fisico".to_string(),
            string_list(self.achados_exame_fisico),
        );
        fields
    }
}

fn string_list(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

/// Outcome of classifying one note: either the five structured categories or
/// the error fallback that keeps the failed row in the output for auditing.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Classified(Classification),
    Failed { erro: String, obs: String },
}

impl Extraction {
    pub fn is_failed(&self) -> bool {
        matches!(self, Extraction::Failed { .. })
    }

    pub fn into_fields(self) -> Map<String, Value> {
        match self {
            Extraction::Classified(classification) => classification.into_fields(),
            Extraction::Failed { erro, obs } => {
                let mut fields = Map::new();
                fields.insert("erro".to_string(), Value::String(erro));
                fields.insert("obs".to_string(), Value::String(obs));
                fields
            }
        }
    }
}

/// Accumulated output of one pipeline run, in input row order.
#[derive(Debug, Clone)]
pub struct TabulationResult {
    pub records: Vec<Record>,
    pub skipped: usize,
    pub failed: usize,
}

/// Summary returned to the invocation surface after the artifacts are written.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub output_path: String,
}
