use k8s_openapi::api::core::v1::Namespace;

use kube::ResourceExt;
use kube::{
    Client,
    api::{Api, ListParams},
};

use crate::error::KubeError;

#[derive(Clone, Debug, Default)]
pub struct NamespaceData {
    pub names: Vec<String>,
}

impl NamespaceData {
    pub fn new() -> Self {
        NamespaceData { names: Vec::new() }
    }

    /// Replaces the cached names with the cluster's current namespaces.
    pub async fn update(&mut self, client: Client) -> Result<(), KubeError> {
        let ns_api: Api<Namespace> = Api::all(client);

        let ns_list = ns_api.list(&ListParams::default()).await?.items;
        self.names = ns_list.iter().map(|ns| ns.name_any()).collect();
        tracing::debug!("Listed {} namespaces", self.names.len());

        Ok(())
    }
}
