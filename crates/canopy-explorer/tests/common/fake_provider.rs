//! A profile-backed provider whose clusters are served from memory.
//!
//! Every root lists two leaves, `a` and `b`, and counts how often it was listed.
//! Profiles whose `options` is not an object fail to connect.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use canopy_explorer::error::{ExplorerError, Result};
use canopy_explorer::{
    Backend, BackendError, BackendHandle, ClientBinding, ClusterProvider, Connector, Document,
    Entry, Interaction, TreeItem, TreeNode,
};
use serde_json::{Value, json};

pub const FAKE_STATE: &str = "test.fake-explorer";

#[derive(Default)]
pub struct CountingBackend {
    pub lists: AtomicUsize,
}

#[async_trait]
impl Backend for CountingBackend {
    async fn list(&self, path: &str) -> std::result::Result<Vec<Entry>, BackendError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            Entry::new("a", format!("{path}/a"), true),
            Entry::new("b", format!("{path}/b"), true),
        ])
    }

    async fn fetch(&self, path: &str) -> std::result::Result<Option<Document>, BackendError> {
        Ok(Some(Document::new("plaintext", path)))
    }

    fn tree_item(&self, name: &str, _path: &str, leaf: bool) -> TreeItem {
        TreeItem::new(name, leaf)
    }
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    pub backend: Arc<CountingBackend>,
}

impl Connector for FakeProvider {
    fn connect(&self, _options: &Value) -> Result<BackendHandle> {
        Ok(self.backend.clone())
    }
}

#[async_trait]
impl ClusterProvider for FakeProvider {
    type Node = TreeNode;

    fn title(&self) -> &'static str {
        "fake"
    }

    fn storage_key(&self) -> Option<&'static str> {
        Some(FAKE_STATE)
    }

    fn name(&self, profile: &Value) -> String {
        profile
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| profile.to_string())
    }

    fn is_valid(&self, profile: &Value) -> bool {
        profile.get("name").and_then(Value::as_str).is_some()
    }

    fn merge(&self, existing: &mut Value, incoming: &Value) {
        existing["options"] = incoming["options"].clone();
    }

    async fn connect(&self, profile: &Value, ui: Arc<dyn Interaction>) -> Result<TreeNode> {
        if !profile["options"].is_object() {
            return Err(ExplorerError::ConfigParse {
                profile: self.name(profile),
                reason: "options must be an object".to_owned(),
            });
        }
        TreeNode::new(
            self.name(profile),
            "",
            false,
            ClientBinding::Unconfigured {
                options: profile["options"].to_string(),
            },
            self,
            ui,
        )
    }

    async fn prompt_profile(&self, ui: &dyn Interaction) -> Option<Value> {
        let name = ui.input("Please specify the cluster name:", "").await?;
        Some(json!({ "name": name, "options": { "hosts": name } }))
    }
}
