//! End-to-end pipeline test against the in-memory search index and
//! filesystem-backed warehouse and object storage.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::fs;

use dataset_indexer::export::ExportConfig;
use dataset_indexer::loader::{BulkLoader, LoaderConfig};
use dataset_indexer::orchestrator::DatasetOrchestrator;
use dataset_indexer_repository::{FileWarehouse, FsObjectStore, InMemoryIndex, ObjectStoreProvider};
use dataset_indexer_shared::DatasetConfig;

struct Fixture {
    _warehouse_dir: tempfile::TempDir,
    _store_dir: tempfile::TempDir,
    index: Arc<InMemoryIndex>,
    store: Arc<FsObjectStore>,
    orchestrator: DatasetOrchestrator,
}

async fn write_table(root: &std::path::Path, table: &str, schema: Value, rows: &[Value]) {
    fs::write(
        root.join(format!("{table}.schema.json")),
        serde_json::to_string(&schema).unwrap(),
    )
    .await
    .unwrap();
    let ndjson: String = rows
        .iter()
        .map(|row| format!("{row}\n"))
        .collect();
    fs::write(root.join(format!("{table}.ndjson")), ndjson)
        .await
        .unwrap();
}

async fn fixture(dataset: Value) -> Fixture {
    let warehouse_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    let root = warehouse_dir.path();

    write_table(
        root,
        "proj.ds.participants",
        json!([
            {"name": "participant_id", "type": "STRING", "mode": "REQUIRED"},
            {"name": "age", "type": "INTEGER", "description": "Age at enrollment"},
            {"name": "status", "type": "STRING"}
        ]),
        &[
            json!({"participant_id": "p1", "age": 40, "status": "active"}),
            json!({"participant_id": "p2", "age": 55, "status": null}),
        ],
    )
    .await;

    write_table(
        root,
        "proj.ds.samples",
        json!([
            {"name": "participant_id", "type": "STRING", "mode": "REQUIRED"},
            {"name": "sample_id", "type": "STRING", "mode": "REQUIRED"},
            {"name": "assay", "type": "STRING"},
            {"name": "cram_path", "type": "STRING"}
        ]),
        &[
            json!({"participant_id": "p1", "sample_id": "x1", "assay": "rna", "cram_path": "gs://b/x1.cram"}),
            json!({"participant_id": "p1", "sample_id": "x2", "assay": "wgs", "cram_path": ""}),
        ],
    )
    .await;

    write_table(
        root,
        "proj.ds.sample_qc",
        json!([
            {"name": "participant_id", "type": "STRING", "mode": "REQUIRED"},
            {"name": "sample_id", "type": "STRING", "mode": "REQUIRED"},
            {"name": "call_rate", "type": "FLOAT"}
        ]),
        &[json!({"participant_id": "p1", "sample_id": "x1", "call_rate": 0.98})],
    )
    .await;

    let store = Arc::new(FsObjectStore::new(store_dir.path()));
    store.ensure_bucket("release-bucket").await.unwrap();
    store
        .write_text(
            "release-bucket",
            "manifests/files.csv",
            "participant_id,file_path,file_type\n\
             p1,gs://b/x1.cram,CRAM\n\
             p2,gs://b/p2.vcf,VCF\n",
        )
        .await
        .unwrap();

    let index = Arc::new(InMemoryIndex::new());
    let dataset: DatasetConfig = serde_json::from_value(dataset).unwrap();
    let loader = BulkLoader::with_config(
        index.clone(),
        LoaderConfig {
            workers: 2,
            batch_size: 10,
            ..LoaderConfig::default()
        },
    );
    let orchestrator = DatasetOrchestrator::new(
        dataset,
        Arc::new(FileWarehouse::new(root, store.clone())),
        index.clone(),
        store.clone(),
        loader,
        Some(ExportConfig {
            bucket: "exports".to_string(),
            object: "samples.json".to_string(),
        }),
    );

    Fixture {
        _warehouse_dir: warehouse_dir,
        _store_dir: store_dir,
        index,
        store,
        orchestrator,
    }
}

fn dataset_config() -> Value {
    json!({
        "name": "Study Of Studies",
        "primary_key": "participant_id",
        "sample_id_column": "sample_id",
        "tables": [
            "proj.ds.participants",
            "proj.ds.samples",
            "proj.ds.sample_qc"
        ],
        "sample_file_columns": { "CRAM": "proj.ds.samples.cram_path" },
        "manifest_files": [{
            "name": "sequencing",
            "bucket": "release-bucket",
            "object": "manifests/files.csv",
            "primary_key": "participant_id",
            "file_key_column": "file_path"
        }],
        "recreate_index": true
    })
}

#[tokio::test]
async fn full_load_folds_tables_manifests_and_export() {
    let fixture = fixture(dataset_config()).await;
    fixture.orchestrator.run().await.unwrap();

    assert_eq!(fixture.orchestrator.index_name(), "study_of_studies");
    assert_eq!(fixture.index.len("study_of_studies"), 2);

    // Direct table fields land namespaced at the document root; null and
    // empty values never appear.
    let p1 = fixture.index.document("study_of_studies", "p1").unwrap();
    assert_eq!(p1["proj.ds.participants.age"], json!(40));
    assert_eq!(p1["proj.ds.participants.status"], json!("active"));
    let p2 = fixture.index.document("study_of_studies", "p2").unwrap();
    assert_eq!(p2["proj.ds.participants.age"], json!(55));
    assert!(p2.get("proj.ds.participants.status").is_none());

    // Sample rows from both tables merged by sample id into one element.
    let samples = p1["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 2);
    let x1 = samples
        .iter()
        .find(|s| s["sample_id"] == json!("x1"))
        .unwrap();
    assert_eq!(x1["proj.ds.samples.assay"], json!("rna"));
    assert_eq!(x1["proj.ds.sample_qc.call_rate"], json!(0.98));
    assert_eq!(x1["_has_cram"], json!(true));
    let x2 = samples
        .iter()
        .find(|s| s["sample_id"] == json!("x2"))
        .unwrap();
    assert_eq!(x2["_has_cram"], json!(false));

    // Manifest rows merged into files arrays, keyed on file_path.
    let files = p1["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["file_path"], json!("gs://b/x1.cram"));
    assert_eq!(files[0]["sequencing.file_type"], json!("CRAM"));
    let p2_files = p2["files"].as_array().unwrap();
    assert_eq!(p2_files[0]["sequencing.file_type"], json!("VCF"));

    // Field registry entries live in the sibling index under their ids.
    let age = fixture
        .index
        .document("study_of_studies_fields", "proj.ds.participants.age")
        .unwrap();
    assert_eq!(age["name"], json!("age"));
    assert_eq!(age["description"], json!("Age at enrollment"));
    assert!(fixture
        .index
        .document("study_of_studies_fields", "samples._has_cram")
        .is_some());

    // Export snapshot carries the flattened samples.
    let body = fixture
        .store
        .read_text("exports", "samples.json")
        .await
        .unwrap();
    let records: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(records.len(), 2);
    let exported_x1 = records
        .iter()
        .find(|r| r["sample_id"] == json!("x1"))
        .unwrap();
    assert_eq!(exported_x1["participant_id"], json!("p1"));
    assert_eq!(exported_x1["assay"], json!("rna"));
    assert_eq!(exported_x1["call_rate"], json!(0.98));
}

#[tokio::test]
async fn rerun_without_recreate_is_idempotent() {
    let mut config = dataset_config();
    config["recreate_index"] = json!(false);
    let fixture = fixture(config).await;
    fixture.orchestrator.run().await.unwrap();
    fixture.orchestrator.run().await.unwrap();

    let p1 = fixture.index.document("study_of_studies", "p1").unwrap();
    assert_eq!(p1["samples"].as_array().unwrap().len(), 2);
    assert_eq!(p1["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn time_series_table_pivots_into_buckets() {
    let warehouse_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    let root = warehouse_dir.path();

    write_table(
        root,
        "proj.ds.observations",
        json!([
            {"name": "participant_id", "type": "STRING", "mode": "REQUIRED"},
            {"name": "visit", "type": "FLOAT"},
            {"name": "weight", "type": "FLOAT"},
            {"name": "heart_rate", "type": "INTEGER"}
        ]),
        &[
            json!({"participant_id": "p1", "visit": 1.0, "weight": 70.5, "heart_rate": 64}),
            json!({"participant_id": "p1", "visit": 2.5, "weight": 71.0, "heart_rate": 66}),
        ],
    )
    .await;

    let store = Arc::new(FsObjectStore::new(store_dir.path()));
    let index = Arc::new(InMemoryIndex::new());
    let dataset: DatasetConfig = serde_json::from_value(json!({
        "name": "Longitudinal",
        "primary_key": "participant_id",
        "time_series_column": "visit",
        "tables": ["proj.ds.observations"],
        "recreate_index": true
    }))
    .unwrap();
    let orchestrator = DatasetOrchestrator::new(
        dataset,
        Arc::new(FileWarehouse::new(root, store.clone())),
        index.clone(),
        store,
        BulkLoader::new(index.clone()),
        None,
    );

    orchestrator.run().await.unwrap();

    let p1 = index.document("longitudinal", "p1").unwrap();
    let weight = &p1["proj.ds.observations.weight"];
    assert_eq!(weight["_is_time_series"], json!(true));
    assert_eq!(weight["1_0"], json!(70.5));
    assert_eq!(weight["2_5"], json!(71.0));
    let heart_rate = &p1["proj.ds.observations.heart_rate"];
    assert_eq!(heart_rate["1_0"], json!(64));

    // The mapping declared a bucket per distinct pivot value.
    let mappings = index.applied_mappings("longitudinal");
    let declared = &mappings[0]["properties"]["proj.ds.observations.weight"]["properties"];
    assert!(declared.get("1_0").is_some());
    assert!(declared.get("2_5").is_some());
    assert!(declared.get("_is_time_series").is_some());
}

#[tokio::test]
async fn table_without_entity_column_aborts_before_writing() {
    let warehouse_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    let root = warehouse_dir.path();

    write_table(
        root,
        "proj.ds.orphans",
        json!([{"name": "age", "type": "INTEGER"}]),
        &[json!({"age": 9})],
    )
    .await;

    let store = Arc::new(FsObjectStore::new(store_dir.path()));
    let index = Arc::new(InMemoryIndex::new());
    let dataset: DatasetConfig = serde_json::from_value(json!({
        "name": "Broken",
        "primary_key": "participant_id",
        "tables": ["proj.ds.orphans"]
    }))
    .unwrap();
    let orchestrator = DatasetOrchestrator::new(
        dataset,
        Arc::new(FileWarehouse::new(root, store.clone())),
        index.clone(),
        store,
        BulkLoader::new(index.clone()),
        None,
    );

    assert!(orchestrator.run().await.is_err());
    assert!(index.is_empty("broken"));
}
