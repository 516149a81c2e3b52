use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use canopy_explorer::{ConfigChange, Explorer, TreeSource, Upsert};
use canopy_sqlite_backend::StateStore;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

mod common;
use common::fake_provider::{FAKE_STATE, FakeProvider};
use common::memory_store;
use common::scripted_ui::ScriptedInteraction;

#[tokio::test]
async fn added_cluster_shows_up_as_a_root() {
    let store = memory_store().await;
    let ui = Arc::new(ScriptedInteraction::new().answer_input(Some("a")));
    let (config_tx, _) = broadcast::channel(4);
    let explorer = Explorer::new(FakeProvider::default(), store, ui, &config_tx);
    let mut refreshes = explorer.subscribe();

    assert_eq!(explorer.add_cluster().await.unwrap(), Some("a".to_owned()));
    assert!(refreshes.try_recv().unwrap().is_none());

    let roots = explorer.get_children(None).await;
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].name(), "a");
    assert_eq!(explorer.get_tree_item(&roots[0]).label, "a");
}

#[tokio::test]
async fn broken_profile_does_not_hide_the_good_ones() {
    let store = memory_store().await;
    store
        .set(
            FAKE_STATE,
            json!([
                {"name": "bad", "options": "not-an-object"},
                {"name": "good", "options": {"hosts": "good"}},
            ])
            .to_string(),
        )
        .await
        .unwrap();
    let ui = Arc::new(ScriptedInteraction::new());
    let (config_tx, _) = broadcast::channel(4);
    let explorer = Explorer::new(FakeProvider::default(), store, ui, &config_tx);

    let roots = explorer.get_children(None).await;
    let names: Vec<_> = roots.iter().map(|root| root.name().to_owned()).collect();
    assert_eq!(names, ["good"]);
}

#[tokio::test]
async fn cancelled_add_stores_nothing() {
    let store = memory_store().await;
    let ui = Arc::new(ScriptedInteraction::new().answer_input(None));
    let (config_tx, _) = broadcast::channel(4);
    let explorer = Explorer::new(FakeProvider::default(), store.clone(), ui, &config_tx);

    assert_eq!(explorer.add_cluster().await.unwrap(), None);
    assert_eq!(store.get(FAKE_STATE).await.unwrap(), None);
}

#[tokio::test]
async fn upsert_updates_in_place_without_duplicates() {
    let store = memory_store().await;
    let ui = Arc::new(ScriptedInteraction::new());
    let (config_tx, _) = broadcast::channel(4);
    let explorer = Explorer::new(FakeProvider::default(), store.clone(), ui, &config_tx);

    let first = explorer
        .upsert_profile(json!({"name": "a", "options": {"hosts": "old"}}))
        .await
        .unwrap();
    explorer
        .upsert_profile(json!({"name": "b", "options": {"hosts": "b"}}))
        .await
        .unwrap();
    let second = explorer
        .upsert_profile(json!({"name": "a", "options": {"hosts": "new"}}))
        .await
        .unwrap();

    assert_eq!(first, Upsert::Added);
    assert_eq!(second, Upsert::Updated);
    let stored: serde_json::Value =
        serde_json::from_str(&store.get(FAKE_STATE).await.unwrap().unwrap()).unwrap();
    assert_eq!(
        stored,
        json!([
            {"name": "a", "options": {"hosts": "new"}},
            {"name": "b", "options": {"hosts": "b"}}
        ])
    );
}

#[tokio::test]
async fn concurrent_upserts_keep_every_profile() {
    let store = memory_store().await;
    let ui = Arc::new(ScriptedInteraction::new());
    let (config_tx, _) = broadcast::channel(4);
    let explorer = Explorer::new(FakeProvider::default(), store.clone(), ui, &config_tx);

    let writes = (0..8).map(|i| {
        let explorer = Arc::clone(&explorer);
        tokio::spawn(async move {
            explorer
                .upsert_profile(json!({"name": format!("c{i}"), "options": {}}))
                .await
        })
    });
    for write in futures::future::join_all(writes).await {
        write.unwrap().unwrap();
    }

    let names: HashSet<_> = explorer
        .get_clusters()
        .await
        .iter()
        .map(|n| n.name().to_owned())
        .collect();
    assert_eq!(names.len(), 8);
}

#[tokio::test]
async fn refresh_storm_does_not_duplicate_roots() {
    let store = memory_store().await;
    store
        .set(
            FAKE_STATE,
            json!([{"name": "a", "options": {}}, {"name": "b", "options": {}}]).to_string(),
        )
        .await
        .unwrap();
    let ui = Arc::new(ScriptedInteraction::new());
    let (config_tx, _) = broadcast::channel(4);
    let explorer = Explorer::new(FakeProvider::default(), store, ui, &config_tx);

    for _ in 0..16 {
        explorer.refresh(None);
    }
    let roots = explorer.get_children(None).await;
    let names: Vec<_> = roots.iter().map(|n| n.name()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn children_are_listed_lazily_once_per_expansion() {
    let store = memory_store().await;
    store
        .set(FAKE_STATE, json!([{"name": "a", "options": {}}]).to_string())
        .await
        .unwrap();
    let provider = FakeProvider::default();
    let backend = Arc::clone(&provider.backend);
    let ui = Arc::new(ScriptedInteraction::new());
    let (config_tx, _) = broadcast::channel(4);
    let explorer = Explorer::new(provider, store, ui, &config_tx);

    let roots = explorer.get_children(None).await;
    assert_eq!(backend.lists.load(Ordering::SeqCst), 0);

    let children = explorer.get_children(Some(&roots[0])).await;
    assert_eq!(backend.lists.load(Ordering::SeqCst), 1);
    assert_eq!(children.len(), 2);

    assert!(explorer.get_children(Some(&children[0])).await.is_empty());
    assert_eq!(backend.lists.load(Ordering::SeqCst), 1);

    let document = explorer.activate(&children[1]).await.unwrap();
    assert_eq!(document.content, "/b");
}

#[tokio::test]
async fn configuration_change_refreshes_the_whole_tree() {
    let store = memory_store().await;
    let ui = Arc::new(ScriptedInteraction::new());
    let (config_tx, _) = broadcast::channel(4);
    let explorer = Explorer::new(FakeProvider::default(), store, ui, &config_tx);
    let mut refreshes = explorer.subscribe();

    config_tx
        .send(ConfigChange::new(vec!["editor.fontSize".to_owned()]))
        .unwrap();
    config_tx
        .send(ConfigChange::new(vec!["canopy.refreshInterval".to_owned()]))
        .unwrap();

    let stale = timeout(Duration::from_secs(1), refreshes.recv())
        .await
        .expect("timed out waiting for a refresh")
        .unwrap();
    assert!(stale.is_none());
    assert!(refreshes.try_recv().is_err());
}
