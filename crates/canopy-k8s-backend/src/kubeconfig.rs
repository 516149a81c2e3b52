//! Namespace lookup and switching by editing the kubeconfig file in place.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde_yaml::{Mapping, Value};

use crate::error::KubeError;

pub const DEFAULT_NAMESPACE: &str = "default";

/// First entry of `KUBECONFIG`, else `~/.kube/config`.
pub fn default_path() -> Result<PathBuf, KubeError> {
    if let Some(paths) = std::env::var_os("KUBECONFIG") {
        if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Ok(first);
        }
    }
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".kube").join("config"))
        .ok_or(KubeError::NoKubeconfig)
}

/// A loaded kubeconfig. Fields this type does not know about are written back untouched.
#[derive(Debug, Clone)]
pub struct Kubeconfig {
    path: PathBuf,
    doc: Value,
}

impl Kubeconfig {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, KubeError> {
        let path = path.into();
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| KubeError::KubeconfigIo {
                path: path.clone(),
                source,
            })?;
        let doc = serde_yaml::from_str(&raw)?;
        Ok(Kubeconfig { path, doc })
    }

    pub async fn load_default() -> Result<Self, KubeError> {
        Self::load(default_path()?).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_context(&self) -> Option<&str> {
        self.doc.get("current-context").and_then(Value::as_str)
    }

    fn context_entry(&self, name: &str) -> Option<&Value> {
        self.doc
            .get("contexts")?
            .as_sequence()?
            .iter()
            .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
    }

    /// Namespace of the current context, `default` when none is set.
    pub fn current_namespace(&self) -> String {
        self.current_context()
            .and_then(|name| self.context_entry(name))
            .and_then(|entry| entry.get("context"))
            .and_then(|context| context.get("namespace"))
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_owned()
    }

    /// Sets the namespace of the current context and saves the file.
    pub async fn switch_namespace(&mut self, namespace: &str) -> Result<(), KubeError> {
        let current = self
            .current_context()
            .ok_or_else(|| KubeError::MissingContext(String::new()))?
            .to_owned();

        let entry = self
            .doc
            .get_mut("contexts")
            .and_then(Value::as_sequence_mut)
            .and_then(|contexts| {
                contexts
                    .iter_mut()
                    .find(|entry| entry.get("name").and_then(Value::as_str) == Some(current.as_str()))
            })
            .ok_or_else(|| KubeError::MissingContext(current.clone()))?;

        let Some(entry) = entry.as_mapping_mut() else {
            return Err(KubeError::MissingContext(current));
        };
        if !entry.get("context").is_some_and(Value::is_mapping) {
            entry.insert(Value::from("context"), Value::Mapping(Mapping::new()));
        }
        if let Some(context) = entry.get_mut("context").and_then(Value::as_mapping_mut) {
            context.insert(Value::from("namespace"), Value::from(namespace));
        }

        self.save().await?;
        tracing::info!("Context {} now uses namespace {}", current, namespace);
        Ok(())
    }

    async fn save(&self) -> Result<(), KubeError> {
        let raw = serde_yaml::to_string(&self.doc)?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|source| KubeError::KubeconfigIo {
                path: self.path.clone(),
                source,
            })
    }
}
