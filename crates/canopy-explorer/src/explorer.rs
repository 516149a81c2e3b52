use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};

use canopy_sqlite_backend::StateStore;

use crate::config::{ConfigChange, SETTINGS_NAMESPACE};
use crate::error::{ExplorerError, Result};
use crate::interaction::{Clipboard, Interaction, NotifyLevel};
use crate::node::{TreeNode, TreeSource};
use crate::profiles::{Upsert, parse_profile_list, retain_unselected, upsert};
use crate::sequence::append;
use crate::tree::{Document, TreeItem};

const REFRESH_CHANNEL_CAPACITY: usize = 64;

/// Everything an explorer needs to know about one kind of backend: how its
/// profiles are named, stored, prompted for and turned into root nodes.
#[async_trait]
pub trait ClusterProvider: Send + Sync + 'static {
    type Node: TreeSource;

    /// Title shown by the presentation layer.
    fn title(&self) -> &'static str;

    /// Key of the persisted profile list, `None` for backends without profiles.
    fn storage_key(&self) -> Option<&'static str>;

    /// Display name (and identity) of a stored profile.
    fn name(&self, profile: &Value) -> String;

    /// Whether a stored profile is complete enough to keep.
    fn is_valid(&self, profile: &Value) -> bool;

    /// Refreshes the credentials/options of `existing` from `incoming`.
    fn merge(&self, existing: &mut Value, incoming: &Value);

    /// Builds a root node bound to a fresh client.
    async fn connect(&self, profile: &Value, ui: Arc<dyn Interaction>) -> Result<Self::Node>;

    /// Asks the user for a new profile. `None` when the user gave up.
    async fn prompt_profile(&self, ui: &dyn Interaction) -> Option<Value>;

    /// Root nodes for the stored profiles; profiles that cannot connect are skipped.
    async fn clusters(&self, profiles: Vec<Value>, ui: Arc<dyn Interaction>) -> Vec<Self::Node> {
        connect_profiles(self, &profiles, ui).await
    }
}

/// Connects every profile concurrently. Roots keep the profile order; failures are skipped.
pub(crate) async fn connect_profiles<P>(
    provider: &P,
    profiles: &[Value],
    ui: Arc<dyn Interaction>,
) -> Vec<P::Node>
where
    P: ClusterProvider + ?Sized,
{
    let connects = profiles.iter().map(|profile| {
        let ui = Arc::clone(&ui);
        async move {
            match provider.connect(profile, ui).await {
                Ok(node) => vec![node],
                Err(err) => {
                    tracing::warn!("Skip invalid cluster: {} ({})", profile, err);
                    Vec::new()
                }
            }
        }
    });
    append(None, connects).await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    NoClusters,
    Cancelled,
    Removed(Vec<String>),
}

/// Root of one tree view: maps persisted profiles to root nodes and delegates deeper
/// traversal to the nodes themselves.
pub struct Explorer<N: TreeSource = TreeNode> {
    provider: Box<dyn ClusterProvider<Node = N>>,
    store: Arc<dyn StateStore>,
    ui: Arc<dyn Interaction>,
    changes: broadcast::Sender<Option<N>>,
    // Serializes this process's read-modify-write cycles on the profile list.
    write_lock: Mutex<()>,
}

impl<N: TreeSource> Explorer<N> {
    /// Creates the explorer and subscribes it to configuration changes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        provider: impl ClusterProvider<Node = N>,
        store: Arc<dyn StateStore>,
        ui: Arc<dyn Interaction>,
        config_changes: &broadcast::Sender<ConfigChange>,
    ) -> Arc<Self> {
        let (changes, _) = broadcast::channel(REFRESH_CHANNEL_CAPACITY);
        let explorer = Arc::new(Explorer {
            provider: Box::new(provider),
            store,
            ui,
            changes,
            write_lock: Mutex::new(()),
        });
        watch_configuration(Arc::downgrade(&explorer), config_changes.subscribe());
        explorer
    }

    pub fn title(&self) -> &'static str {
        self.provider.title()
    }

    /// Stale-node notifications; `None` means the whole tree.
    pub fn subscribe(&self) -> broadcast::Receiver<Option<N>> {
        self.changes.subscribe()
    }

    pub async fn get_clusters(&self) -> Vec<N> {
        let profiles = match self.load_profiles().await {
            Ok(profiles) => profiles,
            Err(err) => {
                tracing::error!("Unable to read {} profiles: {}", self.title(), err);
                Vec::new()
            }
        };
        self.provider
            .clusters(profiles, Arc::clone(&self.ui))
            .await
    }

    pub async fn get_children(&self, parent: Option<&N>) -> Vec<N> {
        match parent {
            Some(node) => node.get_children().await,
            None => self.get_clusters().await,
        }
    }

    pub fn get_tree_item(&self, node: &N) -> TreeItem {
        node.get_tree_item()
    }

    /// Marks `node` (or everything) stale. Performs no I/O.
    pub fn refresh(&self, node: Option<N>) {
        if self.changes.send(node).is_err() {
            tracing::trace!("Refresh of {} with no subscribers", self.title());
        }
    }

    /// Interactive bulk removal: pick profiles, confirm, then persist the rest.
    pub async fn remove_clusters(&self) -> Result<RemovalOutcome> {
        let profiles = match self.provider.storage_key() {
            Some(key) => self.read_profiles(key).await?,
            None => Vec::new(),
        };
        if profiles.is_empty() {
            self.ui
                .notify(NotifyLevel::Info, "No clusters found ... ");
            return Ok(RemovalOutcome::NoClusters);
        }

        let candidates = profiles.iter().map(|p| self.provider.name(p)).collect();
        let selection = match self
            .ui
            .pick_many("Please select clusters you want to remove:", candidates)
            .await
        {
            Some(selection) if !selection.is_empty() => selection,
            _ => return Ok(self.cancelled()),
        };

        let prompt = format!(
            "Are you sure to remove clusters: {}?",
            serde_json::to_string(&selection)?
        );
        if !self.ui.confirm(&prompt).await {
            return Ok(self.cancelled());
        }

        if let Some(key) = self.provider.storage_key() {
            let _guard = self.write_lock.lock().await;
            let current = self.read_profiles(key).await?;
            let kept = retain_unselected(current, &selection, |p| self.provider.name(p));
            self.write_profiles(key, &kept).await?;
        }
        tracing::info!("Removed {} clusters: {:?}", self.title(), selection);
        self.refresh(None);
        Ok(RemovalOutcome::Removed(selection))
    }

    /// Prompts for a profile and stores it. Returns the stored profile's name.
    pub async fn add_cluster(&self) -> Result<Option<String>> {
        let Some(profile) = self.provider.prompt_profile(self.ui.as_ref()).await else {
            return Ok(None);
        };
        let name = self.provider.name(&profile);
        self.upsert_profile(profile).await?;
        Ok(Some(name))
    }

    /// Stores `profile`, updating the entry with the same name in place if any.
    pub async fn upsert_profile(&self, profile: Value) -> Result<Upsert> {
        let Some(key) = self.provider.storage_key() else {
            return Err(ExplorerError::ConfigParse {
                profile: profile.to_string(),
                reason: format!("{} does not store profiles", self.title()),
            });
        };

        let outcome = {
            let _guard = self.write_lock.lock().await;
            let current = self.read_profiles(key).await?;
            let (profiles, outcome) = upsert(
                current,
                profile,
                |p| self.provider.name(p),
                |p| self.provider.is_valid(p),
                |existing, incoming| self.provider.merge(existing, incoming),
            );
            self.write_profiles(key, &profiles).await?;
            outcome
        };
        self.refresh(None);
        Ok(outcome)
    }

    /// Content-fetch entry point. Failures leave the caller's state untouched.
    pub async fn activate(&self, node: &N) -> Option<Document> {
        match node.fetch().await {
            Ok(Some(document)) => Some(document),
            Ok(None) => {
                self.ui.notify(
                    NotifyLevel::Warning,
                    &format!("Got null value of {}.", node.name()),
                );
                None
            }
            Err(err) => {
                tracing::warn!("Fetching {} failed: {}", node.path(), err);
                self.ui.notify(
                    NotifyLevel::Warning,
                    &format!("Unexpected error on talking to {}: {}", node.name(), err),
                );
                None
            }
        }
    }

    pub async fn copy_path(&self, node: &N, clipboard: &dyn Clipboard) {
        match clipboard.write(node.path()).await {
            Ok(()) => self.ui.notify(
                NotifyLevel::Info,
                &format!("copied file path {}", node.path()),
            ),
            Err(err) => self.ui.notify(
                NotifyLevel::Warning,
                &format!("Unable to copy {}: {}", node.path(), err),
            ),
        }
    }

    fn cancelled(&self) -> RemovalOutcome {
        self.ui
            .notify(NotifyLevel::Info, "User cancelled removing clusters ... ");
        RemovalOutcome::Cancelled
    }

    async fn load_profiles(&self) -> Result<Vec<Value>> {
        match self.provider.storage_key() {
            Some(key) => self.read_profiles(key).await,
            None => Ok(Vec::new()),
        }
    }

    async fn read_profiles(&self, key: &str) -> Result<Vec<Value>> {
        let raw = self.store.get(key).await?;
        parse_profile_list(key, raw.as_deref())
    }

    async fn write_profiles(&self, key: &str, profiles: &[Value]) -> Result<()> {
        let raw = serde_json::to_string(profiles)?;
        self.store.set(key, raw).await?;
        Ok(())
    }
}

fn watch_configuration<N: TreeSource>(
    explorer: Weak<Explorer<N>>,
    mut events: broadcast::Receiver<ConfigChange>,
) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(change) if !change.affects(SETTINGS_NAMESPACE) => continue,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Missed {} configuration changes", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
            match explorer.upgrade() {
                Some(explorer) => explorer.refresh(None),
                None => break,
            }
        }
    });
}
