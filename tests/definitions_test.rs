mod common;

use common::name_of;
use fold_autopopulate::mock::MemoryStore;
use fold_autopopulate::{discover, AutopopulateConfig, ReferenceTarget, SchemaRegistry};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const DEFINITIONS: &str = r#"{
    "schemas": [
        {
            "name": "Person",
            "fields": [
                { "name": "name", "type": "String" },
                {
                    "name": "friends",
                    "type": "Array",
                    "of": { "type": "ObjectId", "ref": "people", "autopopulate": { "maxDepth": 1 } }
                }
            ]
        },
        {
            "name": "Band",
            "fields": [
                { "name": "name", "type": "String" },
                { "name": "lead", "type": "ObjectId", "ref": "people", "autopopulate": { "select": "name" } },
                { "name": "tour", "type": "Embedded", "schema": "Tour" }
            ]
        },
        {
            "name": "Tour",
            "fields": [
                { "name": "manager", "type": "ObjectId", "ref": "people", "autopopulate": true }
            ]
        }
    ]
}"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn definitions_file_drives_discovery() {
    let file = write_temp(DEFINITIONS);
    let registry = SchemaRegistry::load_from_file(file.path()).unwrap();
    let band = registry.find_by_name("Band").unwrap();

    let paths = discover(&registry, band, 10).unwrap();
    let names: Vec<&str> = paths.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(names, vec!["lead", "tour.manager"]);
    assert_eq!(paths[1].target, ReferenceTarget::Model("people".to_string()));
}

#[tokio::test]
async fn configured_plugin_populates_loaded_schemas() {
    let definitions = write_temp(DEFINITIONS);
    let config_file = write_temp("functions = { pattern = \"^find\" }\ndefault_max_depth = 5\n");

    let registry = SchemaRegistry::load_from_file(definitions.path()).unwrap();
    let config = AutopopulateConfig::from_file(config_file.path()).unwrap();
    assert_eq!(config.default_max_depth, 5);

    let store = MemoryStore::new(Arc::new(registry));
    store.model("people", "Person").unwrap();
    store.model("bands", "Band").unwrap();
    let plugin = store.install("bands", &config).unwrap();
    assert_eq!(plugin.hook_points().len(), 10);

    let axl = store
        .create("people", json!({ "name": "Axl Rose" }))
        .await
        .unwrap()
        .id();
    let band = store
        .create("bands", json!({ "name": "GNR", "lead": axl, "tour": { "manager": axl } }))
        .await
        .unwrap();
    // save is not instrumented
    assert_eq!(band.get("lead"), Some(json!(axl)));

    let band = store.find_by_id("bands", &band.id()).await.unwrap().unwrap();
    assert_eq!(name_of(band.get("lead.name")).as_deref(), Some("Axl Rose"));
    assert_eq!(name_of(band.get("tour.manager.name")).as_deref(), Some("Axl Rose"));
}
