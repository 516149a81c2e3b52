use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::backend::{Backend, BackendHandle, ClientBinding, Connector, Entry};
use crate::backends::str_field;
use crate::error::{BackendError, ExplorerError, Result};
use crate::explorer::{ClusterProvider, connect_profiles};
use crate::interaction::{Interaction, NotifyLevel};
use crate::language::language_id;
use crate::node::TreeNode;
use crate::sequence::map_list;
use crate::tree::{Activation, Document, TreeItem};

/// Local filesystem access. Paths are plain filesystem paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsBackend;

#[async_trait]
impl Backend for FsBackend {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, BackendError> {
        let mut dir = tokio::fs::read_dir(path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let full = entry.path();
            // Follows symlinks; dangling ones show up as files.
            let is_dir = tokio::fs::metadata(&full)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            entries.push(Entry::new(name, full.to_string_lossy(), !is_dir));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn fetch(&self, path: &str) -> Result<Option<Document>, BackendError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(Document::new(
                language_id(path),
                String::from_utf8_lossy(&bytes),
            ))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn tree_item(&self, name: &str, path: &str, leaf: bool) -> TreeItem {
        let item = TreeItem::new(name, leaf);
        if leaf {
            item.with_activation(Activation::OpenFile(path.to_owned()))
        } else {
            item
        }
    }
}

/// Browses the user's home directory. There are no stored profiles: each entry of the
/// home directory becomes a `{"path": ...}` profile and is connected like any other root.
#[derive(Debug, Clone)]
pub struct FileProvider {
    home: PathBuf,
}

impl FileProvider {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        FileProvider { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

impl Connector for FileProvider {
    fn connect(&self, _options: &Value) -> Result<BackendHandle> {
        Ok(Arc::new(FsBackend))
    }
}

#[async_trait]
impl ClusterProvider for FileProvider {
    type Node = TreeNode;

    fn title(&self) -> &'static str {
        "files"
    }

    fn storage_key(&self) -> Option<&'static str> {
        None
    }

    fn name(&self, profile: &Value) -> String {
        str_field(profile, "path")
            .and_then(|path| Path::new(path).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| profile.to_string())
    }

    fn is_valid(&self, profile: &Value) -> bool {
        str_field(profile, "path").is_some()
    }

    fn merge(&self, _existing: &mut Value, _incoming: &Value) {}

    async fn connect(&self, profile: &Value, ui: Arc<dyn Interaction>) -> Result<TreeNode> {
        let path = str_field(profile, "path").ok_or_else(|| ExplorerError::ConfigParse {
            profile: profile.to_string(),
            reason: "missing path".to_owned(),
        })?;
        let leaf = !tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        TreeNode::new(
            self.name(profile),
            path,
            leaf,
            ClientBinding::Unconfigured {
                options: json!({}).to_string(),
            },
            self,
            ui,
        )
    }

    async fn prompt_profile(&self, _ui: &dyn Interaction) -> Option<Value> {
        None
    }

    async fn clusters(&self, _profiles: Vec<Value>, ui: Arc<dyn Interaction>) -> Vec<TreeNode> {
        let home = self.home.to_string_lossy();
        let listing = match FsBackend.list(&home).await {
            Ok(entries) => Some(entries),
            Err(err) => {
                tracing::warn!("Unable to list {}: {}", home, err);
                ui.notify(
                    NotifyLevel::Warning,
                    &format!("Unable to list home directory {home}: {err}"),
                );
                None
            }
        };
        let profiles =
            map_list(listing, |entry| json!({ "path": entry.path })).unwrap_or_default();
        connect_profiles(self, &profiles, ui).await
    }
}
