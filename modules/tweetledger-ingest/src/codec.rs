use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};

/// Header name of the column that stores the full serialized record. Its
/// absence from the header is a configuration error.
pub const RAW_JSON_COLUMN: &str = "json";

/// A record is the JSON object destined for one row.
pub type Record = Map<String, Value>;

/// A row ready to write, together with the canonical document it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRow {
    pub cells: Vec<String>,
    /// Canonical serialization of the record; also what the raw-JSON cell
    /// holds, which is what makes the row rebuildable later.
    pub raw: String,
}

/// Flatten `record` into a row matching `header`.
///
/// The record is serialized to its canonical JSON document first
/// (serde_json objects are key-sorted); each header column then resolves as
/// a dot-separated path into that document. Header columns absent from the
/// record come out empty, record fields absent from the header are dropped.
/// Fails only if the record cannot be serialized at all.
pub fn encode_row(record: &Record, header: &[String]) -> Result<EncodedRow> {
    let doc = Value::Object(record.clone());
    let raw = serde_json::to_string(&doc).context("serializing record")?;
    let cells = header
        .iter()
        .map(|column| {
            if column == RAW_JSON_COLUMN {
                raw.clone()
            } else {
                resolve_path(&doc, column)
            }
        })
        .collect();
    Ok(EncodedRow { cells, raw })
}

/// Parse a previously stored raw-JSON cell back into a record. A failure
/// here means an unrecoverable prior write and is surfaced to the caller.
pub fn decode_record(raw: &str) -> Result<Record> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(anyhow!("stored JSON is not an object")),
        Err(e) => Err(anyhow!("parsing stored JSON: {e}")),
    }
}

/// Resolve a dot-separated column name inside the document. Each segment
/// indexes one object level. Scalars stringify; null or missing resolve to
/// the empty string; a structured leaf prints as compact JSON.
pub fn resolve_path(doc: &Value, path: &str) -> String {
    let mut cur = doc;
    for segment in path.split('.') {
        match cur {
            Value::Object(map) => match map.get(segment) {
                Some(next) => cur = next,
                None => return String::new(),
            },
            _ => return String::new(),
        }
    }
    match cur {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
