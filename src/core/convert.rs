//! Flattening of record sets into spreadsheet-friendly CSV, and the
//! JSON → CSV conversion command built on top of it.

use crate::domain::model::Record;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, TabuladorError};
use serde_json::Value;

/// Byte-order mark so spreadsheet tools pick up UTF-8.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Flatten records into CSV bytes. The header is the union of all keys in
/// first-seen order; missing and null cells serialize as empty strings and
/// sequence values as compact JSON arrays.
pub fn records_to_csv(records: &[Record]) -> Result<Vec<u8>> {
    let mut buffer = UTF8_BOM.to_vec();
    if records.is_empty() {
        return Ok(buffer);
    }

    let mut columns: Vec<&String> = Vec::new();
    for record in records {
        for key in record.data.keys() {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }

    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(&columns)?;
        for record in records {
            let row: Vec<String> = columns
                .iter()
                .map(|column| cell_text(record.data.get(column.as_str())))
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }

    Ok(buffer)
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Convert a tabulation JSON artifact back into a CSV table. Returns the
/// number of rows written.
pub async fn json_to_csv<S: Storage>(
    storage: &S,
    input_path: &str,
    output_path: &str,
) -> Result<usize> {
    tracing::debug!("Reading JSON artifact: {}", input_path);
    let bytes = storage.read_file(input_path).await?;
    let parsed: Value = serde_json::from_slice(&bytes)?;

    let records = as_record_list(parsed)?;
    let csv_bytes = records_to_csv(&records)?;
    storage.write_file(output_path, &csv_bytes).await?;
    tracing::debug!("CSV saved to: {}", output_path);

    Ok(records.len())
}

fn as_record_list(parsed: Value) -> Result<Vec<Record>> {
    let Value::Array(items) = parsed else {
        return Err(list_shape_error());
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(data) = item else {
            return Err(list_shape_error());
        };
        records.push(Record { data });
    }
    Ok(records)
}

fn list_shape_error() -> TabuladorError {
    TabuladorError::ProcessingError {
        message: "the JSON file must contain a list of objects".to_string(),
    }
}
