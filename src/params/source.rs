//! Raw parameter sources: the JSON parameter file and the `key=value;...`
//! parameter string.

use std::path::Path;

use super::error::{Diagnostics, ParamError, ParamWarning, Result};
use super::value::{ParamMap, ParamValue};

/// Separator between entries of a parameter string.
pub const ENTRY_SEPARATOR: char = ';';
/// Separator between key and value inside an entry.
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Load a parameter file holding a single JSON object.
///
/// A missing or blank path yields an empty map. A path that cannot be read,
/// or whose content is not a JSON object, is an error.
pub fn parse_file(path: Option<&Path>) -> Result<ParamMap> {
    let Some(path) = path else {
        return Ok(ParamMap::new());
    };
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Ok(ParamMap::new());
    }

    let fail = |reason: String| ParamError::ParamFile {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let document: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| fail(e.to_string()))?;

    match document {
        serde_json::Value::Object(object) => Ok(object
            .into_iter()
            .map(|(key, value)| (key, ParamValue::from(value)))
            .collect()),
        other => Err(fail(format!(
            "expected a JSON object, found {}",
            ParamValue::from(other).kind_name()
        ))),
    }
}

/// Parse `key=value;key=value` into a map of string values.
///
/// Blank entries are skipped silently. Entries without exactly one `=`, or
/// with an empty key, are reported and skipped. Keys and values are trimmed.
/// A repeated key keeps its first position and its last value.
pub fn parse_param_str(input: Option<&str>, diagnostics: &mut Diagnostics) -> ParamMap {
    let mut params = ParamMap::new();
    let Some(input) = input else {
        return params;
    };

    for entry in input.split(ENTRY_SEPARATOR) {
        if entry.trim().is_empty() {
            continue;
        }
        let mut parts = entry.split(KEY_VALUE_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) if !key.trim().is_empty() => {
                params.insert(key.trim(), ParamValue::Str(value.trim().to_string()));
            }
            _ => diagnostics.warn(ParamWarning::MalformedEntry {
                entry: entry.trim().to_string(),
            }),
        }
    }

    params
}
