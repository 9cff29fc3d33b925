//! Upgrade for documents written before board data moved to the top level.
//!
//! Old documents kept the board under an `init` key:
//!
//! ```json
//! {"init": {"harbors": [{"hex": 3, "edge": "c", "resource": "ore"}],
//!           "grid": "<rows of 14 characters>", "name": "standard34"}}
//! ```

use crate::document::DEFAULT_LAYOUT;
use serde_json::{Map, Value};

/// Characters per grid row in the legacy encoding
const GRID_ROW_WIDTH: usize = 14;

/// Characters per grid cell
const GRID_CELL_WIDTH: usize = 2;

/// Rewrite a legacy document in place. Returns whether anything changed.
pub fn upgrade(doc: &mut Map<String, Value>) -> bool {
    let Some(init) = doc.remove("init") else {
        return false;
    };

    let harbors: Map<String, Value> = init
        .get("harbors")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|h| {
                    let key = format!("{}{}", key_part(&h["hex"]), key_part(&h["edge"]));
                    (key, h.get("resource").cloned().unwrap_or(Value::Null))
                })
                .collect()
        })
        .unwrap_or_default();

    let grid = init
        .get("grid")
        .and_then(Value::as_str)
        .map(split_grid)
        .unwrap_or_default();

    let layout = init
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_LAYOUT)
        .to_string();

    doc.insert("harbors".into(), Value::Object(harbors));
    doc.insert(
        "grid".into(),
        Value::Array(
            grid.into_iter()
                .map(|row| Value::Array(row.into_iter().map(Value::String).collect()))
                .collect(),
        ),
    );
    doc.insert("layout".into(), Value::String(layout));
    doc.entry("isSync").or_insert(Value::Bool(false));

    true
}

fn key_part(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Split the flat grid string into full rows of two-character cells.
/// A trailing partial row or cell is dropped.
fn split_grid(encoded: &str) -> Vec<Vec<String>> {
    let chars: Vec<char> = encoded.chars().collect();
    chars
        .chunks_exact(GRID_ROW_WIDTH)
        .map(|row| {
            row.chunks_exact(GRID_CELL_WIDTH)
                .map(|cell| cell.iter().collect())
                .collect()
        })
        .collect()
}
