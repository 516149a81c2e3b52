use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{BackendHandle, ClientBinding, Connector};
use crate::error::{BackendError, Result};
use crate::interaction::{Interaction, NotifyLevel};
use crate::tree::{Document, TreeItem};

/// A navigable node of some remote hierarchy.
#[async_trait]
pub trait TreeSource: Clone + Send + Sync + 'static {
    fn name(&self) -> &str;

    fn path(&self) -> &str;

    /// Immediate children, listed with a single backend call. Listing failures are
    /// reported to the user and resolve to an empty list.
    async fn get_children(&self) -> Vec<Self>;

    fn get_tree_item(&self) -> TreeItem;

    async fn fetch(&self) -> Result<Option<Document>, BackendError>;
}

/// Node of any backend: a name, a backend-specific path and the shared client.
#[derive(Clone)]
pub struct TreeNode {
    name: String,
    path: String,
    leaf: bool,
    client: BackendHandle,
    ui: Arc<dyn Interaction>,
}

impl TreeNode {
    /// Builds a node, resolving `binding` into a client handle first.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        leaf: bool,
        binding: ClientBinding,
        connector: &dyn Connector,
        ui: Arc<dyn Interaction>,
    ) -> Result<Self> {
        let name = name.into();
        let client = binding.resolve(&name, connector)?;
        Ok(TreeNode {
            name,
            path: path.into(),
            leaf,
            client,
            ui,
        })
    }

    pub fn bound(
        name: impl Into<String>,
        path: impl Into<String>,
        leaf: bool,
        client: BackendHandle,
        ui: Arc<dyn Interaction>,
    ) -> Self {
        TreeNode {
            name: name.into(),
            path: path.into(),
            leaf,
            client,
            ui,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn client(&self) -> &BackendHandle {
        &self.client
    }
}

impl std::fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("leaf", &self.leaf)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TreeSource for TreeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        &self.path
    }

    async fn get_children(&self) -> Vec<TreeNode> {
        if self.leaf {
            return Vec::new();
        }

        match self.client.list(&self.path).await {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| {
                    TreeNode::bound(
                        entry.name,
                        entry.path,
                        entry.leaf,
                        Arc::clone(&self.client),
                        Arc::clone(&self.ui),
                    )
                })
                .collect(),
            Err(err) => {
                tracing::warn!("Listing {} under '{}' failed: {}", self.name, self.path, err);
                self.ui.notify(
                    NotifyLevel::Warning,
                    &format!("Unexpected error on talking to {}: {}", self.name, err),
                );
                Vec::new()
            }
        }
    }

    fn get_tree_item(&self) -> TreeItem {
        self.client.tree_item(&self.name, &self.path, self.leaf)
    }

    async fn fetch(&self) -> Result<Option<Document>, BackendError> {
        self.client.fetch(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Entry, MockBackend};
    use crate::error::ExplorerError;
    use crate::interaction::MockInteraction;

    fn quiet_ui() -> Arc<dyn Interaction> {
        let mut ui = MockInteraction::new();
        ui.expect_notify().never();
        Arc::new(ui)
    }

    struct FixedConnector;

    impl Connector for FixedConnector {
        fn connect(&self, options: &serde_json::Value) -> Result<BackendHandle> {
            if options.get("hosts").is_none() {
                return Err(ExplorerError::ConfigParse {
                    profile: options.to_string(),
                    reason: "hosts missing".to_owned(),
                });
            }
            let mut backend = MockBackend::new();
            backend.expect_list().returning(|_| Ok(Vec::new()));
            Ok(Arc::new(backend))
        }
    }

    #[tokio::test]
    async fn leaf_never_contacts_backend() {
        let mut backend = MockBackend::new();
        backend.expect_list().never();
        let node = TreeNode::bound("key", "/key", true, Arc::new(backend), quiet_ui());

        assert!(node.get_children().await.is_empty());
    }

    #[tokio::test]
    async fn internal_node_lists_once_per_call() {
        let mut backend = MockBackend::new();
        backend
            .expect_list()
            .withf(|path: &str| path == "/")
            .times(2)
            .returning(|_| {
                Ok(vec![
                    Entry::new("/a", "/a", true),
                    Entry::new("/b", "/b", true),
                ])
            });
        let node = TreeNode::bound("etcd", "/", false, Arc::new(backend), quiet_ui());

        assert_eq!(node.get_children().await.len(), 2);
        assert_eq!(node.get_children().await.len(), 2);
    }

    #[tokio::test]
    async fn children_share_the_parent_client() {
        let mut backend = MockBackend::new();
        backend
            .expect_list()
            .returning(|_| Ok(vec![Entry::new("docs", "docs", false)]));
        let node = TreeNode::bound("repo", "", false, Arc::new(backend), quiet_ui());

        let children = node.get_children().await;
        assert_eq!(children.len(), 1);
        assert!(Arc::ptr_eq(children[0].client(), node.client()));
        assert_eq!(children[0].path(), "docs");
        assert!(!children[0].is_leaf());
    }

    #[tokio::test]
    async fn listing_failure_warns_and_resolves_empty() {
        let mut backend = MockBackend::new();
        backend.expect_list().times(1).returning(|_| {
            Err(BackendError::Status {
                endpoint: "http://127.0.0.1:2379".to_owned(),
                status: 503,
                body: "unavailable".to_owned(),
            })
        });
        let mut ui = MockInteraction::new();
        ui.expect_notify()
            .withf(|level: &NotifyLevel, message: &str| {
                *level == NotifyLevel::Warning
                    && message.starts_with("Unexpected error on talking to etcd:")
            })
            .times(1)
            .return_const(());
        let node = TreeNode::bound("etcd", "/", false, Arc::new(backend), Arc::new(ui));

        assert!(node.get_children().await.is_empty());
    }

    #[test]
    fn unconfigured_binding_builds_a_client() {
        let node = TreeNode::new(
            "local",
            "/",
            false,
            ClientBinding::Unconfigured {
                options: r#"{"hosts":"127.0.0.1:2379"}"#.to_owned(),
            },
            &FixedConnector,
            quiet_ui(),
        );
        assert!(node.is_ok());
    }

    #[test]
    fn unusable_options_fail_construction() {
        for options in ["not json", r#"{"endpoints":[]}"#] {
            let err = TreeNode::new(
                "broken",
                "/",
                false,
                ClientBinding::Unconfigured {
                    options: options.to_owned(),
                },
                &FixedConnector,
                quiet_ui(),
            )
            .unwrap_err();
            assert!(matches!(err, ExplorerError::InvariantViolation { .. }));
        }
    }

    #[test]
    fn tree_item_follows_backend_policy() {
        let mut backend = MockBackend::new();
        backend
            .expect_tree_item()
            .returning(|name: &str, _path: &str, leaf: bool| TreeItem::new(name, leaf));
        let node = TreeNode::bound("bucket", "bucket/", false, Arc::new(backend), quiet_ui());

        let item = node.get_tree_item();
        assert_eq!(item.label, "bucket");
        assert_eq!(item.collapsible, crate::tree::Collapsible::Collapsed);
    }
}
