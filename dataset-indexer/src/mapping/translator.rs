use std::collections::BTreeMap;

use dataset_indexer_shared::{FieldMode, FieldRegistryEntry, FieldType, SchemaField, TableSchema};
use serde_json::{json, Map, Value};

use crate::errors::PipelineError;

/// Per-table inputs the translator needs beyond the schema itself.
pub struct TableContext<'a> {
    /// Fully qualified table name.
    pub table: &'a str,
    /// Column holding the participant identifier.
    pub entity_id_column: &'a str,
    /// Column holding the sample identifier, when the dataset has one.
    pub sample_id_column: Option<&'a str>,
    /// Artifact type -> fully qualified source column.
    pub artifact_columns: &'a BTreeMap<String, String>,
    /// Column whose values become time-series buckets, when configured.
    pub time_series_column: Option<&'a str>,
}

/// Output of translating one table schema.
#[derive(Debug)]
pub struct TableMapping {
    /// Mapping body ready for a put-mapping call on the entity index.
    pub mapping: Value,
    /// Field registry entries describing every searchable field the table adds.
    pub registry: Vec<FieldRegistryEntry>,
}

/// Translates a warehouse table schema into a search index mapping fragment
/// plus the field registry entries for the table.
///
/// # Arguments
/// * `schema` - The table schema as read from the warehouse.
/// * `ctx` - Dataset-level context for the table.
/// * `pivot_keys` - Distinct bucket keys for time-series tables, `None` otherwise.
///
/// # Returns
/// The mapping fragment and registry entries, or a configuration error when
/// the schema and dataset configuration disagree.
pub fn translate_table(
    schema: &TableSchema,
    ctx: &TableContext,
    pivot_keys: Option<&[String]>,
) -> Result<TableMapping, PipelineError> {
    if !schema.has_column(ctx.entity_id_column) {
        return Err(PipelineError::config(format!(
            "Table {} has no entity id column {}",
            ctx.table, ctx.entity_id_column
        )));
    }

    let sample_column = ctx
        .sample_id_column
        .filter(|column| schema.has_column(column));
    let pivot_column = ctx
        .time_series_column
        .filter(|column| schema.has_column(column));

    if sample_column.is_some() && pivot_column.is_some() {
        return Err(PipelineError::config(format!(
            "Table {} carries both a sample id column and a time-series column",
            ctx.table
        )));
    }

    if let Some(pivot) = pivot_column {
        let keys = pivot_keys.ok_or_else(|| {
            PipelineError::config(format!(
                "Table {} is a time-series table but no pivot keys were supplied",
                ctx.table
            ))
        })?;
        return Ok(translate_time_series(schema, ctx, pivot, keys));
    }

    if let Some(sample) = sample_column {
        return Ok(translate_sample_table(schema, ctx, sample));
    }

    Ok(translate_direct(schema, ctx))
}

fn translate_direct(schema: &TableSchema, ctx: &TableContext) -> TableMapping {
    let mut properties = Map::new();
    let mut registry = Vec::new();

    for field in &schema.fields {
        if field.name == ctx.entity_id_column {
            continue;
        }
        let qualified = format!("{}.{}", ctx.table, field.name);
        properties.insert(qualified.clone(), field_mapping(field));
        collect_registry(field, &qualified, &field.name, &mut registry);
    }

    TableMapping {
        mapping: mapping_body(properties),
        registry,
    }
}

fn translate_sample_table(
    schema: &TableSchema,
    ctx: &TableContext,
    sample_column: &str,
) -> TableMapping {
    let mut sample_properties = Map::new();
    let mut registry = Vec::new();

    for field in &schema.fields {
        if field.name == ctx.entity_id_column {
            continue;
        }
        if field.name == sample_column {
            sample_properties.insert(field.name.clone(), field_mapping(field));
            collect_registry(
                field,
                &format!("samples.{}", field.name),
                &field.name,
                &mut registry,
            );
            continue;
        }
        let qualified = format!("{}.{}", ctx.table, field.name);
        sample_properties.insert(qualified, field_mapping(field));
        collect_registry(
            field,
            &format!("samples.{}.{}", ctx.table, field.name),
            &field.name,
            &mut registry,
        );
    }

    for artifact_type in ctx.artifact_columns.keys() {
        let flag = artifact_flag_name(artifact_type);
        sample_properties.insert(flag.clone(), json!({ "type": "boolean" }));
        registry.push(FieldRegistryEntry::new(format!("samples.{flag}"), flag));
    }

    let mut properties = Map::new();
    properties.insert(
        "samples".to_string(),
        json!({ "type": "nested", "properties": sample_properties }),
    );

    TableMapping {
        mapping: mapping_body(properties),
        registry,
    }
}

fn translate_time_series(
    schema: &TableSchema,
    ctx: &TableContext,
    pivot_column: &str,
    pivot_keys: &[String],
) -> TableMapping {
    let mut properties = Map::new();
    let mut registry = Vec::new();

    for field in &schema.fields {
        if field.name == ctx.entity_id_column || field.name == pivot_column {
            continue;
        }
        let qualified = format!("{}.{}", ctx.table, field.name);
        let leaf = field_mapping(field);
        let mut buckets = Map::new();
        buckets.insert("_is_time_series".to_string(), json!({ "type": "boolean" }));
        for key in pivot_keys {
            buckets.insert(key.clone(), leaf.clone());
        }
        properties.insert(qualified.clone(), json!({ "properties": buckets }));
        collect_registry(field, &qualified, &field.name, &mut registry);
    }

    TableMapping {
        mapping: mapping_body(properties),
        registry,
    }
}

fn mapping_body(properties: Map<String, Value>) -> Value {
    json!({ "properties": properties })
}

/// Search index mapping for a single schema field, recursing into records.
fn field_mapping(field: &SchemaField) -> Value {
    if field.field_type == FieldType::Record {
        let mut children = Map::new();
        for child in &field.fields {
            children.insert(child.name.clone(), field_mapping(child));
        }
        return if field.mode == FieldMode::Repeated {
            json!({ "type": "nested", "properties": children })
        } else {
            json!({ "properties": children })
        };
    }

    match field.field_type {
        FieldType::Text => json!({
            "type": "text",
            "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
        }),
        FieldType::Integer => json!({ "type": "long" }),
        FieldType::Float => json!({ "type": "float" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::Timestamp => json!({
            "type": "date",
            "format": "yyyy-MM-dd HH:mm:ss.SSSSSS zzz"
        }),
        FieldType::DateTime => json!({ "type": "date" }),
        FieldType::Date => json!({ "type": "date", "format": "yyyy-MM-dd" }),
        FieldType::Time => json!({ "type": "date", "format": "HH:mm:ss" }),
        FieldType::Record => unreachable!("records handled above"),
    }
}

fn collect_registry(
    field: &SchemaField,
    id: &str,
    name: &str,
    registry: &mut Vec<FieldRegistryEntry>,
) {
    let entry = FieldRegistryEntry::new(id, name).with_description(field.description.clone());
    registry.push(entry);

    for child in &field.fields {
        collect_registry(
            child,
            &format!("{}.{}", id, child.name),
            &format!("{}.{}", name, child.name),
            registry,
        );
    }
}

/// Synthetic boolean flag name for an artifact type, e.g. `_has_cram`.
pub(crate) fn artifact_flag_name(artifact_type: &str) -> String {
    let sanitized: String = artifact_type
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("_has_{sanitized}")
}

/// Converts a pivot column value to a bucket key usable as a document field
/// name. Decimal points would otherwise read as object path separators.
pub fn pivot_bucket_key(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    raw.replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context<'a>(artifacts: &'a BTreeMap<String, String>) -> TableContext<'a> {
        TableContext {
            table: "proj.ds.samples",
            entity_id_column: "participant_id",
            sample_id_column: Some("sample_id"),
            artifact_columns: artifacts,
            time_series_column: None,
        }
    }

    #[test]
    fn translates_direct_table_with_qualified_names() {
        let schema = TableSchema {
            fields: vec![
                SchemaField::new("participant_id", FieldType::Text),
                SchemaField::new("age", FieldType::Integer)
                    .with_description("Age at enrollment"),
            ],
        };
        let artifacts = BTreeMap::new();
        let ctx = TableContext {
            table: "proj.ds.participants",
            entity_id_column: "participant_id",
            sample_id_column: None,
            artifact_columns: &artifacts,
            time_series_column: None,
        };

        let translated = translate_table(&schema, &ctx, None).unwrap();

        let properties = &translated.mapping["properties"];
        assert_eq!(properties["proj.ds.participants.age"]["type"], "long");
        assert!(properties.get("participant_id").is_none());
        assert_eq!(translated.registry.len(), 1);
        assert_eq!(translated.registry[0].name, "age");
        assert_eq!(
            translated.registry[0].description.as_deref(),
            Some("Age at enrollment")
        );
    }

    #[test]
    fn maps_every_primitive_type_to_its_index_body() {
        let cases = [
            (
                FieldType::Text,
                json!({
                    "type": "text",
                    "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
                }),
            ),
            (FieldType::Integer, json!({ "type": "long" })),
            (FieldType::Float, json!({ "type": "float" })),
            (FieldType::Boolean, json!({ "type": "boolean" })),
            (
                FieldType::Timestamp,
                json!({ "type": "date", "format": "yyyy-MM-dd HH:mm:ss.SSSSSS zzz" }),
            ),
            (FieldType::DateTime, json!({ "type": "date" })),
            (
                FieldType::Date,
                json!({ "type": "date", "format": "yyyy-MM-dd" }),
            ),
            (
                FieldType::Time,
                json!({ "type": "date", "format": "HH:mm:ss" }),
            ),
        ];

        let mut fields = vec![SchemaField::new("participant_id", FieldType::Text)];
        for (index, (field_type, _)) in cases.iter().enumerate() {
            fields.push(SchemaField::new(format!("col_{index}"), *field_type));
        }
        let schema = TableSchema { fields };
        let artifacts = BTreeMap::new();
        let ctx = TableContext {
            table: "proj.ds.typed",
            entity_id_column: "participant_id",
            sample_id_column: None,
            artifact_columns: &artifacts,
            time_series_column: None,
        };

        let translated = translate_table(&schema, &ctx, None).unwrap();

        let properties = &translated.mapping["properties"];
        for (index, (field_type, expected)) in cases.iter().enumerate() {
            let mapped = &properties[&format!("proj.ds.typed.col_{index}")];
            assert_eq!(mapped, expected, "mapping body for {field_type:?}");
        }
    }

    #[test]
    fn translates_sample_table_into_nested_samples() {
        let schema = TableSchema {
            fields: vec![
                SchemaField::new("participant_id", FieldType::Text),
                SchemaField::new("sample_id", FieldType::Text),
                SchemaField::new("assay", FieldType::Text),
            ],
        };
        let mut artifacts = BTreeMap::new();
        artifacts.insert("CRAM".to_string(), "proj.ds.samples.cram_path".to_string());
        let ctx = sample_context(&artifacts);

        let translated = translate_table(&schema, &ctx, None).unwrap();

        let samples = &translated.mapping["properties"]["samples"];
        assert_eq!(samples["type"], "nested");
        let nested = &samples["properties"];
        assert!(nested.get("sample_id").is_some());
        assert!(nested.get("proj.ds.samples.assay").is_some());
        assert_eq!(nested["_has_cram"]["type"], "boolean");

        let ids: Vec<&str> = translated.registry.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&"samples.sample_id"));
        assert!(ids.contains(&"samples.proj.ds.samples.assay"));
        assert!(ids.contains(&"samples._has_cram"));
    }

    #[test]
    fn translates_time_series_table_with_pivot_buckets() {
        let schema = TableSchema {
            fields: vec![
                SchemaField::new("participant_id", FieldType::Text),
                SchemaField::new("visit", FieldType::Integer),
                SchemaField::new("weight", FieldType::Float),
            ],
        };
        let artifacts = BTreeMap::new();
        let ctx = TableContext {
            table: "proj.ds.measurements",
            entity_id_column: "participant_id",
            sample_id_column: None,
            artifact_columns: &artifacts,
            time_series_column: Some("visit"),
        };
        let keys = vec!["1".to_string(), "2".to_string()];

        let translated = translate_table(&schema, &ctx, Some(&keys)).unwrap();

        let weight = &translated.mapping["properties"]["proj.ds.measurements.weight"];
        assert_eq!(weight["properties"]["_is_time_series"]["type"], "boolean");
        assert_eq!(weight["properties"]["1"]["type"], "float");
        assert_eq!(weight["properties"]["2"]["type"], "float");
        assert!(translated.mapping["properties"]
            .get("proj.ds.measurements.visit")
            .is_none());
    }

    #[test]
    fn missing_entity_column_is_a_config_error() {
        let schema = TableSchema {
            fields: vec![SchemaField::new("age", FieldType::Integer)],
        };
        let artifacts = BTreeMap::new();
        let ctx = TableContext {
            table: "proj.ds.participants",
            entity_id_column: "participant_id",
            sample_id_column: None,
            artifact_columns: &artifacts,
            time_series_column: None,
        };

        let err = translate_table(&schema, &ctx, None).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }

    #[test]
    fn sample_and_time_series_columns_are_mutually_exclusive() {
        let schema = TableSchema {
            fields: vec![
                SchemaField::new("participant_id", FieldType::Text),
                SchemaField::new("sample_id", FieldType::Text),
                SchemaField::new("visit", FieldType::Integer),
            ],
        };
        let artifacts = BTreeMap::new();
        let mut ctx = sample_context(&artifacts);
        ctx.time_series_column = Some("visit");

        let err = translate_table(&schema, &ctx, None).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }

    #[test]
    fn nested_record_fields_recurse_into_registry() {
        let schema = TableSchema {
            fields: vec![
                SchemaField::new("participant_id", FieldType::Text),
                SchemaField::record(
                    "address",
                    vec![
                        SchemaField::new("city", FieldType::Text),
                        SchemaField::new("zip", FieldType::Text),
                    ],
                ),
            ],
        };
        let artifacts = BTreeMap::new();
        let ctx = TableContext {
            table: "proj.ds.participants",
            entity_id_column: "participant_id",
            sample_id_column: None,
            artifact_columns: &artifacts,
            time_series_column: None,
        };

        let translated = translate_table(&schema, &ctx, None).unwrap();

        let address = &translated.mapping["properties"]["proj.ds.participants.address"];
        assert!(address["properties"].get("city").is_some());
        let names: Vec<&str> = translated.registry.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["address", "address.city", "address.zip"]);
    }

    #[test]
    fn pivot_bucket_key_replaces_decimal_points() {
        assert_eq!(pivot_bucket_key(&json!(1.5)), "1_5");
        assert_eq!(pivot_bucket_key(&json!(2)), "2");
        assert_eq!(pivot_bucket_key(&json!("week 3")), "week 3");
        assert_eq!(pivot_bucket_key(&json!("v1.2")), "v1_2");
    }
}
