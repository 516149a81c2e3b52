use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::error::KubeError;

#[derive(Default, Clone)]
pub struct KubeContext {
    pub client: Option<Client>,
}

impl KubeContext {
    /// Connects using the current context of the kubeconfig at `path`.
    pub async fn init_context_from(&mut self, path: &Path) -> Result<(), KubeError> {
        let kubeconfig = Kubeconfig::read_from(path)?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        self.client = Some(Client::try_from(config)?);
        tracing::debug!("Kubernetes client built from {}", path.display());

        Ok(())
    }
}
