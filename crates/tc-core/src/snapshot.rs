//! Persisted snapshot format.
//!
//! The stored value is a JSON array of `ToolInstance`. Decoding is
//! tolerant: an export envelope `{tools, timestamp, version}` is accepted
//! too, entries that fail to decode are skipped, positions are clamped
//! into the canvas range, and duplicate ids are re-issued.

use crate::id::ToolId;
use crate::model::ToolInstance;
use serde_json::Value;
use std::collections::HashSet;

/// Largest coordinate (units) accepted from storage.
pub const MAX_COORDINATE: f64 = 10_000.0;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot is not a tool array")]
    NotAnArray,
}

/// Serialize a tool list into its stored form.
pub fn encode_snapshot(tools: &[ToolInstance]) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(tools)?)
}

/// Decode a stored value into a tool list.
pub fn decode_snapshot(text: &str) -> Result<Vec<ToolInstance>, SnapshotError> {
    let value: Value = serde_json::from_str(text)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("tools") {
            Some(Value::Array(items)) => items,
            _ => return Err(SnapshotError::NotAnArray),
        },
        _ => return Err(SnapshotError::NotAnArray),
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut tools = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<ToolInstance>(item) {
            Ok(mut tool) => {
                tool.position = tool.position.clamped(MAX_COORDINATE);
                if !seen.insert(tool.id) {
                    let fresh = ToolId::generate();
                    log::warn!("snapshot: duplicate id {} re-issued as {}", tool.id, fresh);
                    tool.id = fresh;
                    seen.insert(fresh);
                }
                tools.push(tool);
            }
            Err(e) => log::warn!("snapshot: skipping entry {i}: {e}"),
        }
    }
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<ToolInstance> {
        vec![ToolInstance {
            id: ToolId::intern("a"),
            name: "calculate".into(),
            params: [("expression".to_string(), "2 + 2".to_string())].into(),
            position: Position::new(2.0, 2.0),
        }]
    }

    #[test]
    fn roundtrip_is_deep_equal() {
        let tools = sample();
        let text = encode_snapshot(&tools).unwrap();
        assert_eq!(decode_snapshot(&text).unwrap(), tools);
    }

    #[test]
    fn accepts_envelope() {
        let text = r#"{"tools":[{"id":"a","name":"calculate","params":{"expression":"2 + 2"},"position":{"x":2,"y":2}}],"timestamp":"t","version":"2.0.0"}"#;
        assert_eq!(decode_snapshot(text).unwrap(), sample());
    }

    #[test]
    fn rejects_non_arrays() {
        assert!(matches!(decode_snapshot("42"), Err(SnapshotError::NotAnArray)));
        assert!(matches!(decode_snapshot(r#"{"x":1}"#), Err(SnapshotError::NotAnArray)));
        assert!(matches!(decode_snapshot("{oops"), Err(SnapshotError::Json(_))));
    }

    #[test]
    fn skips_bad_entries_and_clamps() {
        let text = r#"[{"name":"no id"},{"id":"b","name":"x","position":{"x":-4,"y":99999}}]"#;
        let tools = decode_snapshot(text).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].position, Position::new(0.0, MAX_COORDINATE));
        assert!(tools[0].params.is_empty());
    }

    #[test]
    fn duplicate_ids_are_reissued() {
        let text = r#"[{"id":"d","name":"x"},{"id":"d","name":"y"}]"#;
        let tools = decode_snapshot(text).unwrap();
        assert_eq!(tools[0].id, ToolId::intern("d"));
        assert_ne!(tools[1].id, tools[0].id);
    }
}
