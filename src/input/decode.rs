//! JSON Lines decoding

use crate::error::{Error, Result};
use serde_json::Value;

/// Decode a JSON Lines body (one object per line).
///
/// Blank lines are skipped. A line that is not valid JSON, or is valid JSON
/// but not an object, fails the whole body; records are never skipped.
pub fn decode_json_lines(body: &str, source: &str) -> Result<Vec<Value>> {
    let mut records = Vec::new();

    for (line_num, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|e| Error::Decode {
            message: format!("{source}:{}: invalid JSON: {e}", line_num + 1),
        })?;
        if !value.is_object() {
            return Err(Error::decode(format!(
                "{source}:{}: expected a JSON object",
                line_num + 1
            )));
        }

        records.push(value);
    }

    Ok(records)
}
