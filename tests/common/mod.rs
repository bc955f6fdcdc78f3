//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use fold_autopopulate::mock::MemoryStore;
use fold_autopopulate::schema::ScalarType;
use fold_autopopulate::{AutopopulateConfig, Directive, FieldDescriptor, SchemaId, SchemaRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn text() -> FieldDescriptor {
    FieldDescriptor::scalar(ScalarType::String)
}

/// `Person { name, birthName, friends: [ref people] }`
pub fn add_person(registry: &mut SchemaRegistry, friends: impl Into<Directive>) -> SchemaId {
    let person = registry.add("Person");
    registry
        .get_mut(person)
        .unwrap()
        .add_field("name", text())
        .add_field("birthName", text())
        .add_field(
            "friends",
            FieldDescriptor::array_of(FieldDescriptor::reference("people").autopopulate(friends)),
        );
    person
}

/// `Band { name, lead, members, producer }` over `people`
pub fn add_band(registry: &mut SchemaRegistry, lead: impl Into<Directive>, producer: impl Into<Directive>) -> SchemaId {
    let band = registry.add("Band");
    registry
        .get_mut(band)
        .unwrap()
        .add_field("name", text())
        .add_field("lead", FieldDescriptor::reference("people").autopopulate(lead))
        .add_field(
            "members",
            FieldDescriptor::array_of(FieldDescriptor::reference("people").autopopulate(true)),
        )
        .add_field("producer", FieldDescriptor::reference("people").autopopulate(producer));
    band
}

/// Store with `people` and `bands` registered and the plugin on both
pub fn music_store(registry: SchemaRegistry, config: &AutopopulateConfig) -> Arc<MemoryStore> {
    let store = MemoryStore::new(Arc::new(registry));
    store.model("people", "Person").unwrap();
    store.model("bands", "Band").unwrap();
    store.install("people", config).unwrap();
    store.install("bands", config).unwrap();
    store
}

pub fn default_music_store() -> Arc<MemoryStore> {
    let mut registry = SchemaRegistry::new();
    add_person(&mut registry, false);
    add_band(
        &mut registry,
        true,
        Directive::from_json(json!({ "select": "name" })),
    );
    music_store(registry, &AutopopulateConfig::default())
}

pub async fn person(store: &Arc<MemoryStore>, name: &str, friends: &[&str]) -> String {
    store
        .create(
            "people",
            json!({ "name": name, "birthName": format!("{} (born)", name), "friends": friends }),
        )
        .await
        .unwrap()
        .id()
}

/// Guns N' Roses with Axl as lead and producer
pub async fn seed_band(store: &Arc<MemoryStore>) -> (String, String, String) {
    let axl = person(store, "Axl Rose", &[]).await;
    let slash = person(store, "Slash", &[]).await;
    let band = store
        .create(
            "bands",
            json!({ "name": "Guns N' Roses", "lead": axl, "members": [axl, slash], "producer": axl }),
        )
        .await
        .unwrap()
        .id();
    (band, axl, slash)
}

pub fn name_of(value: Option<Value>) -> Option<String> {
    value.and_then(|v| v.as_str().map(str::to_string))
}
