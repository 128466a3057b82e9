//! Painless translation of the portable merge operations.
//!
//! The operation semantics (append-or-merge-by-key, time-series bucket
//! insert) are the contract; the script text here is the OpenSearch-specific
//! rendering. Scripts run atomically per document on the server, which is
//! what lets hash-partitioned workers write without coordinating.

use serde_json::{json, Map, Value};

use crate::errors::SearchIndexError;
use crate::types::IndexOperation;
use crate::utils::validate_script_identifier;

/// Script implementing append-or-merge-by-key on a nested array field.
///
/// If the array does not exist it is created with the incoming element as its
/// only member. Otherwise the array is scanned for an element whose key
/// column matches the incoming element's; on a match the incoming attributes
/// are merged field-by-field (last writer wins), and on a miss the element is
/// appended. Element identity by key is unique after the merge.
pub fn array_merge_script(
    array_field: &str,
    key_column: &str,
) -> Result<String, SearchIndexError> {
    if !validate_script_identifier(array_field) {
        return Err(SearchIndexError::validation(format!(
            "Array field '{}' contains characters unsafe for scripting",
            array_field
        )));
    }
    if !validate_script_identifier(key_column) {
        return Err(SearchIndexError::validation(format!(
            "Merge key column '{}' contains characters unsafe for scripting",
            key_column
        )));
    }

    Ok(format!(
        "if (ctx._source['{field}'] == null) {{ \
           ctx._source['{field}'] = [params.element]; \
         }} else {{ \
           boolean found = false; \
           for (item in ctx._source['{field}']) {{ \
             if (item['{key}'] == params.element['{key}']) {{ \
               for (entry in params.element.entrySet()) {{ \
                 item[entry.getKey()] = entry.getValue(); \
               }} \
               found = true; \
             }} \
           }} \
           if (!found) {{ ctx._source['{field}'].add(params.element); }} \
         }}",
        field = array_field,
        key = key_column
    ))
}

/// Script implementing the dynamic-key time-series insert.
///
/// For every incoming column, creates the nested bucket on first touch
/// (marking it with `_is_time_series`), then sets the bucket's entry for the
/// row's pivot key. Column names are passed as parameters, never spliced into
/// the script text, so namespaced (dotted) names need no escaping.
pub fn time_series_script() -> &'static str {
    "for (entry in params.fields.entrySet()) { \
       def col = entry.getKey(); \
       if (ctx._source[col] == null) { \
         Map bucket = new HashMap(); \
         bucket['_is_time_series'] = true; \
         ctx._source[col] = bucket; \
       } \
       ctx._source[col][params.point] = entry.getValue(); \
     }"
}

/// Initial document used when a time-series update targets an absent entity.
fn time_series_upsert_doc(bucket_key: &str, fields: &Map<String, Value>) -> Value {
    let mut doc = Map::new();
    for (column, value) in fields {
        let mut bucket = Map::new();
        bucket.insert("_is_time_series".to_string(), json!(true));
        bucket.insert(bucket_key.to_string(), value.clone());
        doc.insert(column.clone(), Value::Object(bucket));
    }
    Value::Object(doc)
}

/// Translate one portable operation into its bulk-update request body.
pub fn update_body(operation: &IndexOperation) -> Result<Value, SearchIndexError> {
    match operation {
        IndexOperation::Upsert { doc, .. } => Ok(json!({
            "doc": doc,
            "doc_as_upsert": true,
        })),
        IndexOperation::ArrayMerge {
            array_field,
            key_column,
            element,
            ..
        } => {
            let source = array_merge_script(array_field, key_column)?;
            let mut upsert = Map::new();
            upsert.insert(array_field.clone(), json!([element]));
            Ok(json!({
                "script": {
                    "source": source,
                    "lang": "painless",
                    "params": { "element": element },
                },
                "upsert": upsert,
            }))
        }
        IndexOperation::TimeSeriesInsert {
            bucket_key, fields, ..
        } => Ok(json!({
            "script": {
                "source": time_series_script(),
                "lang": "painless",
                "params": { "fields": fields, "point": bucket_key },
            },
            "upsert": time_series_upsert_doc(bucket_key, fields),
        })),
    }
}
