mod common;

use common::*;
use fold_autopopulate::mock::{MemoryStore, ReadRequest};
use fold_autopopulate::{AutopopulateConfig, Directive, HookName, QueryOptions, SchemaRegistry};
use serde_json::json;
use std::sync::Arc;

fn people_store(friends: Directive, config: &AutopopulateConfig) -> Arc<MemoryStore> {
    let mut registry = SchemaRegistry::new();
    add_person(&mut registry, friends);
    add_band(&mut registry, true, false);
    music_store(registry, config)
}

/// Axl -> Slash -> Duff -> Izzy, one friend each
async fn friend_chain(store: &Arc<MemoryStore>) -> String {
    let izzy = person(store, "Izzy", &[]).await;
    let duff = person(store, "Duff", &[izzy.as_str()]).await;
    let slash = person(store, "Slash", &[duff.as_str()]).await;
    person(store, "Axl", &[slash.as_str()]).await
}

#[tokio::test]
async fn max_depth_two_stops_at_the_third_level() {
    let store = people_store(
        Directive::from_json(json!({ "maxDepth": 2 })),
        &AutopopulateConfig::default(),
    );
    let axl = friend_chain(&store).await;

    let axl = store.find_by_id("people", &axl).await.unwrap().unwrap();
    assert_eq!(name_of(axl.get("friends.0.name")).as_deref(), Some("Slash"));
    assert_eq!(name_of(axl.get("friends.0.friends.0.name")).as_deref(), Some("Duff"));

    let third = axl.get("friends.0.friends.0.friends.0").unwrap();
    assert!(third.is_string(), "third level should stay an id, got {}", third);
}

#[tokio::test]
async fn self_reference_without_limit_follows_the_whole_chain() {
    let store = people_store(Directive::Enabled, &AutopopulateConfig::default());
    let axl = friend_chain(&store).await;

    let axl = store.find_by_id("people", &axl).await.unwrap().unwrap();
    assert_eq!(
        name_of(axl.get("friends.0.friends.0.friends.0.name")).as_deref(),
        Some("Izzy")
    );
}

#[tokio::test]
async fn configured_default_depth_bounds_cycles() {
    let mut config = AutopopulateConfig::default();
    config.default_max_depth = 3;
    let store = people_store(Directive::Enabled, &config);

    // Axl and Slash are each other's friend
    let axl = person(&store, "Axl", &[]).await;
    let slash = person(&store, "Slash", &[axl.as_str()]).await;
    let axl_doc = store.find_by_id("people", &axl).await.unwrap().unwrap();
    axl_doc.set("friends", json!([slash])).unwrap();
    store.save(&axl_doc).await.unwrap();

    let axl_doc = store.find_by_id("people", &axl).await.unwrap().unwrap();
    assert_eq!(name_of(axl_doc.get("friends.0.name")).as_deref(), Some("Slash"));
    assert_eq!(name_of(axl_doc.get("friends.0.friends.0.name")).as_deref(), Some("Axl"));
    assert_eq!(
        name_of(axl_doc.get("friends.0.friends.0.friends.0.name")).as_deref(),
        Some("Slash")
    );
    assert!(axl_doc
        .get("friends.0.friends.0.friends.0.friends.0")
        .unwrap()
        .is_string());
}

#[tokio::test]
async fn operation_max_depth_caps_nested_reads() {
    let store = people_store(Directive::Enabled, &AutopopulateConfig::default());
    let axl = friend_chain(&store).await;

    let request = ReadRequest::new(HookName::FindOne, "people")
        .filter(json!({ "_id": axl }))
        .options(QueryOptions::default().with_max_depth(1));
    let found = store.execute(request).await.unwrap();

    assert_eq!(name_of(found[0].get("friends.0.name")).as_deref(), Some("Slash"));
    assert!(found[0].get("friends.0.friends.0").unwrap().is_string());
}

#[tokio::test]
async fn operation_max_depth_zero_does_not_block() {
    let store = people_store(Directive::Enabled, &AutopopulateConfig::default());
    let axl = friend_chain(&store).await;

    let request = ReadRequest::new(HookName::FindOne, "people")
        .filter(json!({ "_id": axl }))
        .options(QueryOptions::default().with_max_depth(0));
    let found = store.execute(request).await.unwrap();

    assert_eq!(name_of(found[0].get("friends.0.name")).as_deref(), Some("Slash"));
    assert_eq!(
        name_of(found[0].get("friends.0.friends.0.friends.0.name")).as_deref(),
        Some("Izzy")
    );
}

#[tokio::test]
async fn nested_autopopulate_false_stops_after_one_level() {
    let mut registry = SchemaRegistry::new();
    add_person(&mut registry, true);
    add_band(
        &mut registry,
        Directive::from_json(json!({ "options": { "autopopulate": false } })),
        false,
    );
    let store = music_store(registry, &AutopopulateConfig::default());

    let slash = person(&store, "Slash", &[]).await;
    let axl = person(&store, "Axl Rose", &[slash.as_str()]).await;
    let band = store
        .create("bands", json!({ "name": "Guns N' Roses", "lead": axl, "members": [] }))
        .await
        .unwrap();

    let band = store.find_by_id("bands", &band.id()).await.unwrap().unwrap();
    assert_eq!(name_of(band.get("lead.name")).as_deref(), Some("Axl Rose"));
    assert_eq!(band.get("lead.friends.0"), Some(json!(slash)));
}
