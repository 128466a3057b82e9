use dataset_indexer_repository::IndexOperation;
use dataset_indexer_shared::{is_missing, DatasetConfig, Row, TableSchema};
use serde_json::{Map, Value};

use crate::errors::PipelineError;
use crate::mapping::artifact_flag_name;

/// How a table's rows fold into the entity documents.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeStrategy {
    /// Partial update of top-level fields.
    Direct,
    /// Append-or-merge into the nested `samples` array, keyed on the sample id.
    Samples { sample_id_column: String },
    /// Pivot rows into per-column bucket objects keyed on the pivot value.
    TimeSeries { pivot_column: String },
}

/// Projects one table's rows into index operations.
///
/// Construction validates the table against the dataset configuration, so a
/// misconfigured table fails before any document is written.
pub struct TableProcessor {
    table: String,
    entity_id_column: String,
    strategy: MergeStrategy,
    /// Artifact flag name paired with the bare source column when this table
    /// owns it. Only populated for sample tables.
    artifact_flags: Vec<(String, Option<String>)>,
}

impl TableProcessor {
    pub fn new(
        schema: &TableSchema,
        dataset: &DatasetConfig,
        table: &str,
    ) -> Result<Self, PipelineError> {
        if !schema.has_column(&dataset.primary_key) {
            return Err(PipelineError::config(format!(
                "Table {} has no entity id column {}",
                table, dataset.primary_key
            )));
        }

        let sample_column = dataset
            .sample_id_column
            .as_deref()
            .filter(|column| schema.has_column(column));
        let pivot_column = dataset
            .time_series_column
            .as_deref()
            .filter(|column| schema.has_column(column));

        if sample_column.is_some() && pivot_column.is_some() {
            return Err(PipelineError::config(format!(
                "Table {table} carries both a sample id column and a time-series column"
            )));
        }

        let strategy = if let Some(pivot) = pivot_column {
            MergeStrategy::TimeSeries {
                pivot_column: pivot.to_string(),
            }
        } else if let Some(sample) = sample_column {
            MergeStrategy::Samples {
                sample_id_column: sample.to_string(),
            }
        } else {
            MergeStrategy::Direct
        };

        let artifact_flags = if matches!(strategy, MergeStrategy::Samples { .. }) {
            let owned_prefix = format!("{table}.");
            dataset
                .sample_file_columns
                .iter()
                .map(|(artifact_type, source)| {
                    let bare = source
                        .strip_prefix(&owned_prefix)
                        .filter(|rest| !rest.contains('.'))
                        .map(str::to_string);
                    (artifact_flag_name(artifact_type), bare)
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            table: table.to_string(),
            entity_id_column: dataset.primary_key.clone(),
            strategy,
            artifact_flags,
        })
    }

    pub fn strategy(&self) -> &MergeStrategy {
        &self.strategy
    }

    /// Projects one warehouse row into the index operation that folds it into
    /// its entity document. Missing values are dropped, remaining columns are
    /// namespaced with the table name.
    pub fn process_row(&self, row: &Row) -> Result<IndexOperation, PipelineError> {
        let entity_id = self.entity_id(row)?;

        match &self.strategy {
            MergeStrategy::Direct => {
                let doc = self.project(row, &[]);
                Ok(IndexOperation::Upsert { id: entity_id, doc })
            }
            MergeStrategy::Samples { sample_id_column } => {
                let sample_value = row.get(sample_id_column.as_str());
                if sample_value.map_or(true, is_missing) {
                    return Err(PipelineError::config(format!(
                        "Table {} row for entity {} has no value in sample id column {}",
                        self.table, entity_id, sample_id_column
                    )));
                }
                let mut element = self.project(row, &[sample_id_column]);
                element.insert(
                    sample_id_column.clone(),
                    row[sample_id_column.as_str()].clone(),
                );
                for (flag, bare_column) in &self.artifact_flags {
                    let present = bare_column
                        .as_deref()
                        .and_then(|column| row.get(column))
                        .map_or(false, |value| !is_missing(value));
                    element.insert(flag.clone(), Value::Bool(present));
                }
                Ok(IndexOperation::ArrayMerge {
                    id: entity_id,
                    array_field: "samples".to_string(),
                    key_column: sample_id_column.clone(),
                    element,
                })
            }
            MergeStrategy::TimeSeries { pivot_column } => {
                let pivot_value = row.get(pivot_column.as_str());
                let Some(pivot_value) = pivot_value.filter(|value| !is_missing(value)) else {
                    return Err(PipelineError::config(format!(
                        "Table {} row for entity {} has no value in time-series column {}",
                        self.table, entity_id, pivot_column
                    )));
                };
                let bucket_key = crate::mapping::pivot_bucket_key(pivot_value);
                let fields = self.project(row, &[pivot_column]);
                Ok(IndexOperation::TimeSeriesInsert {
                    id: entity_id,
                    bucket_key,
                    fields,
                })
            }
        }
    }

    fn entity_id(&self, row: &Row) -> Result<String, PipelineError> {
        let value = row.get(self.entity_id_column.as_str());
        match value.filter(|value| !is_missing(value)) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(PipelineError::config(format!(
                "Table {} row has no value in entity id column {}",
                self.table, self.entity_id_column
            ))),
        }
    }

    /// The projected field map: missing values and the entity id dropped,
    /// everything else namespaced `<table>.<column>`.
    fn project(&self, row: &Row, skip: &[&String]) -> Map<String, Value> {
        let mut projected = Map::new();
        for (column, value) in row {
            if column == &self.entity_id_column || skip.iter().any(|s| *s == column) {
                continue;
            }
            if is_missing(value) {
                continue;
            }
            projected.insert(format!("{}.{}", self.table, column), value.clone());
        }
        projected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset_indexer_shared::{FieldType, SchemaField};
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row fixture must be an object"),
        }
    }

    fn dataset() -> DatasetConfig {
        serde_json::from_value(json!({
            "name": "Test Dataset",
            "primary_key": "participant_id",
            "sample_id_column": "sample_id",
            "tables": ["proj.ds.participants", "proj.ds.samples"],
            "sample_file_columns": { "CRAM": "proj.ds.samples.cram_path" }
        }))
        .unwrap()
    }

    fn direct_schema() -> TableSchema {
        TableSchema::new(vec![
            SchemaField::new("participant_id", FieldType::Text),
            SchemaField::new("age", FieldType::Integer),
            SchemaField::new("status", FieldType::Text),
        ])
    }

    fn sample_schema() -> TableSchema {
        TableSchema::new(vec![
            SchemaField::new("participant_id", FieldType::Text),
            SchemaField::new("sample_id", FieldType::Text),
            SchemaField::new("assay", FieldType::Text),
            SchemaField::new("cram_path", FieldType::Text),
        ])
    }

    #[test]
    fn direct_row_becomes_namespaced_upsert() {
        let processor =
            TableProcessor::new(&direct_schema(), &dataset(), "proj.ds.participants").unwrap();

        let op = processor
            .process_row(&row(json!({
                "participant_id": "p1",
                "age": 40,
                "status": ""
            })))
            .unwrap();

        match op {
            IndexOperation::Upsert { id, doc } => {
                assert_eq!(id, "p1");
                assert_eq!(doc["proj.ds.participants.age"], json!(40));
                // Empty strings and the entity id itself do not survive projection.
                assert!(doc.get("proj.ds.participants.status").is_none());
                assert!(doc.get("participant_id").is_none());
            }
            other => panic!("expected upsert, got {other:?}"),
        }
    }

    #[test]
    fn numeric_entity_id_is_stringified() {
        let processor =
            TableProcessor::new(&direct_schema(), &dataset(), "proj.ds.participants").unwrap();

        let op = processor
            .process_row(&row(json!({ "participant_id": 42, "age": 7 })))
            .unwrap();
        assert_eq!(op.id(), "42");
    }

    #[test]
    fn missing_entity_id_is_an_error() {
        let processor =
            TableProcessor::new(&direct_schema(), &dataset(), "proj.ds.participants").unwrap();

        let result = processor.process_row(&row(json!({ "age": 40 })));
        assert!(result.is_err());
        let result = processor.process_row(&row(json!({ "participant_id": null, "age": 40 })));
        assert!(result.is_err());
    }

    #[test]
    fn sample_row_becomes_array_merge_with_artifact_flags() {
        let processor =
            TableProcessor::new(&sample_schema(), &dataset(), "proj.ds.samples").unwrap();
        assert_eq!(
            processor.strategy(),
            &MergeStrategy::Samples {
                sample_id_column: "sample_id".to_string()
            }
        );

        let op = processor
            .process_row(&row(json!({
                "participant_id": "p1",
                "sample_id": "x1",
                "assay": "rna",
                "cram_path": "gs://bucket/x1.cram"
            })))
            .unwrap();

        match op {
            IndexOperation::ArrayMerge {
                id,
                array_field,
                key_column,
                element,
            } => {
                assert_eq!(id, "p1");
                assert_eq!(array_field, "samples");
                assert_eq!(key_column, "sample_id");
                assert_eq!(element["sample_id"], json!("x1"));
                assert_eq!(element["proj.ds.samples.assay"], json!("rna"));
                assert_eq!(element["_has_cram"], json!(true));
            }
            other => panic!("expected array merge, got {other:?}"),
        }
    }

    #[test]
    fn absent_artifact_column_yields_false_flag() {
        let processor =
            TableProcessor::new(&sample_schema(), &dataset(), "proj.ds.samples").unwrap();

        let op = processor
            .process_row(&row(json!({
                "participant_id": "p1",
                "sample_id": "x2",
                "cram_path": ""
            })))
            .unwrap();

        match op {
            IndexOperation::ArrayMerge { element, .. } => {
                assert_eq!(element["_has_cram"], json!(false));
            }
            other => panic!("expected array merge, got {other:?}"),
        }
    }

    #[test]
    fn sample_row_without_sample_id_is_an_error() {
        let processor =
            TableProcessor::new(&sample_schema(), &dataset(), "proj.ds.samples").unwrap();

        let result = processor.process_row(&row(json!({
            "participant_id": "p1",
            "assay": "rna"
        })));
        assert!(result.is_err());
    }

    #[test]
    fn time_series_row_becomes_bucket_insert() {
        let mut config = dataset();
        config.sample_id_column = None;
        config.time_series_column = Some("visit".to_string());
        let schema = TableSchema::new(vec![
            SchemaField::new("participant_id", FieldType::Text),
            SchemaField::new("visit", FieldType::Float),
            SchemaField::new("weight", FieldType::Float),
        ]);
        let processor = TableProcessor::new(&schema, &config, "proj.ds.measurements").unwrap();

        let op = processor
            .process_row(&row(json!({
                "participant_id": "p1",
                "visit": 1.5,
                "weight": 70.2
            })))
            .unwrap();

        match op {
            IndexOperation::TimeSeriesInsert {
                id,
                bucket_key,
                fields,
            } => {
                assert_eq!(id, "p1");
                assert_eq!(bucket_key, "1_5");
                assert_eq!(fields["proj.ds.measurements.weight"], json!(70.2));
                assert!(fields.get("proj.ds.measurements.visit").is_none());
            }
            other => panic!("expected time-series insert, got {other:?}"),
        }
    }

    #[test]
    fn table_missing_entity_column_fails_construction() {
        let schema = TableSchema::new(vec![SchemaField::new("age", FieldType::Integer)]);
        let result = TableProcessor::new(&schema, &dataset(), "proj.ds.participants");
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn sample_and_time_series_table_fails_construction() {
        let mut config = dataset();
        config.time_series_column = Some("visit".to_string());
        let schema = TableSchema::new(vec![
            SchemaField::new("participant_id", FieldType::Text),
            SchemaField::new("sample_id", FieldType::Text),
            SchemaField::new("visit", FieldType::Integer),
        ]);
        let result = TableProcessor::new(&schema, &config, "proj.ds.samples");
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }
}
