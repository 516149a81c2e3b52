use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::{BackendError, ExplorerError, Result};
use crate::tree::{Document, TreeItem};

/// One child reported by a backend listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub path: String,
    pub leaf: bool,
}

impl Entry {
    pub fn new(name: impl Into<String>, path: impl Into<String>, leaf: bool) -> Self {
        Entry {
            name: name.into(),
            path: path.into(),
            leaf,
        }
    }
}

/// Remote listing/fetch capability of one external system.
///
/// Paths are opaque to everything but the implementation: each backend builds child
/// paths with its own addressing scheme (key prefix, repository path, bucket/object
/// path, filesystem path).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Lists the immediate children of `path`.
    async fn list(&self, path: &str) -> Result<Vec<Entry>, BackendError>;

    /// Fetches the content stored at `path`, `None` when nothing is stored there.
    async fn fetch(&self, path: &str) -> Result<Option<Document>, BackendError>;

    /// Presentation policy for nodes served by this backend.
    fn tree_item(&self, name: &str, path: &str, leaf: bool) -> TreeItem;
}

/// Client handle shared by a root node and all of its descendants.
pub type BackendHandle = Arc<dyn Backend>;

/// Builds a backend client from serialized connection options.
pub trait Connector: Send + Sync {
    fn connect(&self, options: &serde_json::Value) -> Result<BackendHandle>;
}

/// How a node gets hold of its backend client.
pub enum ClientBinding {
    /// Serialized connection options; a client is built from them.
    Unconfigured { options: String },
    /// A live client, usually inherited from the parent node.
    Bound(BackendHandle),
}

impl ClientBinding {
    /// Turns the binding into a client handle. Failure here is a contract violation of
    /// whoever built the node and is reported as such.
    pub fn resolve(self, node: &str, connector: &dyn Connector) -> Result<BackendHandle> {
        match self {
            ClientBinding::Bound(handle) => Ok(handle),
            ClientBinding::Unconfigured { options } => {
                let value: serde_json::Value = serde_json::from_str(&options).map_err(|err| {
                    ExplorerError::InvariantViolation {
                        node: node.to_owned(),
                        reason: format!("options are not valid JSON: {err}"),
                    }
                })?;
                connector
                    .connect(&value)
                    .map_err(|err| ExplorerError::InvariantViolation {
                        node: node.to_owned(),
                        reason: err.to_string(),
                    })
            }
        }
    }
}

impl std::fmt::Debug for ClientBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientBinding::Unconfigured { options } => f
                .debug_struct("Unconfigured")
                .field("options", options)
                .finish(),
            ClientBinding::Bound(_) => f.write_str("Bound(..)"),
        }
    }
}
