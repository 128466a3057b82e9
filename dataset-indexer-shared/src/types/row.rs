//! Row values read from the warehouse.

use serde_json::Value;

/// One source row: ordered column name to value pairs. Absent columns may be
/// missing from the map entirely or present with a null value; both count as
/// missing for projection purposes.
pub type Row = serde_json::Map<String, Value>;

/// Whether a source value counts as missing. Nulls and empty strings are
/// dropped from partial documents so they never overwrite a previously
/// written non-null value for the same key.
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
