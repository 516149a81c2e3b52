//! Git hosting repositories browsed through the host's REST API.

mod gitee;
mod gitlab;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::{Value, json};
use url::Url;

use crate::backend::{Backend, BackendHandle, ClientBinding, Connector, Entry};
use crate::backends::str_field;
use crate::error::{BackendError, ExplorerError, Result};
use crate::explorer::ClusterProvider;
use crate::interaction::{Interaction, NotifyLevel};
use crate::language::language_id;
use crate::node::TreeNode;
use crate::tree::{Activation, Document, TreeItem};

pub use gitee::Gitee;
pub use gitlab::GitLab;

pub const GITLAB_STATE: &str = "canopy.gitlab-explorer";

const ROOT_PATH: &str = "";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
}

/// Repository operations every supported hosting service offers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Immediate children of a repository directory; `""` is the repository root.
    async fn list_tree(&self, path: &str) -> Result<Vec<Entry>, BackendError>;

    /// Raw content of a file on the default branch, `None` when absent.
    async fn raw_file(&self, path: &str) -> Result<Option<String>, BackendError>;

    async fn branches(&self) -> Result<Vec<String>, BackendError>;

    /// Usernames of the repository members.
    async fn collaborators(&self) -> Result<Vec<String>, BackendError>;

    /// Opens a merge (pull) request and returns its web URL.
    async fn create_merge_request(&self, request: &MergeRequest) -> Result<String, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHostKind {
    GitLab,
    Gitee,
}

impl GitHostKind {
    pub fn detect(repository: &Url) -> Self {
        match repository.host_str() {
            Some(host) if host == "gitee.com" || host.ends_with(".gitee.com") => GitHostKind::Gitee,
            _ => GitHostKind::GitLab,
        }
    }
}

/// A repository URL split into the API origin and the repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub origin: Url,
    pub path: String,
    pub token: Option<String>,
    pub kind: GitHostKind,
}

impl Repository {
    pub fn parse(host: &str, token: Option<&str>) -> Result<Self> {
        let parse_error = |reason: String| ExplorerError::ConfigParse {
            profile: host.to_owned(),
            reason,
        };
        let url = Url::parse(host).map_err(|err| parse_error(err.to_string()))?;
        if url.host_str().is_none() {
            return Err(parse_error("no host in repository URL".to_owned()));
        }
        let path = url.path().trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path).to_owned();
        if path.is_empty() {
            return Err(parse_error("no repository path in URL".to_owned()));
        }

        let mut origin = url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Repository {
            origin,
            path,
            token: token.filter(|t| !t.is_empty()).map(str::to_owned),
            kind: GitHostKind::detect(&url),
        })
    }

    pub fn connect(&self) -> Arc<dyn GitHost> {
        match self.kind {
            GitHostKind::GitLab => Arc::new(GitLab::new(self)),
            GitHostKind::Gitee => Arc::new(Gitee::new(self)),
        }
    }
}

/// Adapts any [`GitHost`] to the tree backend interface.
pub struct GitBackend {
    host: Arc<dyn GitHost>,
}

impl GitBackend {
    pub fn new(host: Arc<dyn GitHost>) -> Self {
        GitBackend { host }
    }

    pub fn host(&self) -> &Arc<dyn GitHost> {
        &self.host
    }
}

#[async_trait]
impl Backend for GitBackend {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, BackendError> {
        self.host.list_tree(path).await
    }

    async fn fetch(&self, path: &str) -> Result<Option<Document>, BackendError> {
        let content = self.host.raw_file(path).await?;
        Ok(content.map(|content| Document::new(language_id(path), content)))
    }

    fn tree_item(&self, name: &str, _path: &str, leaf: bool) -> TreeItem {
        let item = TreeItem::new(name, leaf);
        if leaf {
            item.with_context_value("gitfile")
                .with_activation(Activation::GetContent)
        } else {
            item.with_context_value("gitfolder")
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitProvider;

impl GitProvider {
    /// Direct access to the hosting API of a stored profile.
    pub fn host_for(&self, profile: &Value) -> Result<Arc<dyn GitHost>> {
        let host = str_field(profile, "host").ok_or_else(|| ExplorerError::ConfigParse {
            profile: profile.to_string(),
            reason: "missing host".to_owned(),
        })?;
        Ok(Repository::parse(host, str_field(profile, "token"))?.connect())
    }
}

impl Connector for GitProvider {
    fn connect(&self, options: &Value) -> Result<BackendHandle> {
        Ok(Arc::new(GitBackend::new(self.host_for(options)?)))
    }
}

#[async_trait]
impl ClusterProvider for GitProvider {
    type Node = TreeNode;

    fn title(&self) -> &'static str {
        "git"
    }

    fn storage_key(&self) -> Option<&'static str> {
        Some(GITLAB_STATE)
    }

    fn name(&self, profile: &Value) -> String {
        str_field(profile, "host")
            .map(str::to_owned)
            .unwrap_or_else(|| profile.to_string())
    }

    fn is_valid(&self, profile: &Value) -> bool {
        str_field(profile, "host").is_some()
    }

    fn merge(&self, existing: &mut Value, incoming: &Value) {
        existing["token"] = incoming.get("token").cloned().unwrap_or(Value::Null);
    }

    async fn connect(&self, profile: &Value, ui: Arc<dyn Interaction>) -> Result<TreeNode> {
        let handle = Connector::connect(self, profile)?;
        TreeNode::new(
            self.name(profile),
            ROOT_PATH,
            false,
            ClientBinding::Bound(handle),
            self,
            ui,
        )
    }

    async fn prompt_profile(&self, ui: &dyn Interaction) -> Option<Value> {
        let host = ui
            .input(
                "Please specify the URL of GitLab repository:",
                "https://gitlab.com/group/repository",
            )
            .await
            .filter(|host| !host.trim().is_empty());
        let Some(host) = host else {
            ui.notify(NotifyLevel::Error, "Repository URL is required.");
            return None;
        };
        let token = ui
            .input("Please specify the token:", "")
            .await
            .filter(|token| !token.is_empty());
        Some(json!({ "host": host.trim(), "token": token }))
    }
}
