use std::path::Path;

use canopy_explorer::Interaction;
use canopy_k8s_backend::{
    KubeContext, KubeError, Kubeconfig, NamespaceData, NamespaceSwitch, use_namespace,
};

/// Lists the cluster's namespaces, falling back to typing one when the cluster is unreachable.
async fn candidates(kubeconfig: &Path) -> Vec<String> {
    let mut context = KubeContext::default();
    if let Err(err) = context.init_context_from(kubeconfig).await {
        tracing::warn!("No cluster connection for namespace listing: {}", err);
        return Vec::new();
    }
    let Some(client) = context.client else {
        return Vec::new();
    };

    let mut namespaces = NamespaceData::new();
    match namespaces.update(client).await {
        Ok(()) => namespaces.names,
        Err(err) => {
            tracing::warn!("Listing namespaces failed: {}", err);
            Vec::new()
        }
    }
}

/// Interactive namespace switch for the kubeconfig at `path` (the default one when `None`).
pub async fn switch_namespace(
    path: Option<&Path>,
    ui: &dyn Interaction,
) -> Result<NamespaceSwitch, KubeError> {
    let mut kubeconfig = match path {
        Some(path) => Kubeconfig::load(path).await?,
        None => Kubeconfig::load_default().await?,
    };
    let names = candidates(kubeconfig.path()).await;
    let prefer_pick = !names.is_empty();
    use_namespace(&mut kubeconfig, ui, &names, None, prefer_pick).await
}
