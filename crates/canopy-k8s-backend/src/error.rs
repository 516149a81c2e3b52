use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KubeError {
    #[error("unable to initialize kubernetes client - please verify you can access the cluster")]
    KubeConnectionError(#[from] kube::Error),
    #[error("unable to access kubeconfig {path}: {source}")]
    KubeconfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("kubeconfig is not valid yaml: {0}")]
    KubeconfigYaml(#[from] serde_yaml::Error),
    #[error("unable to build a client from kubeconfig: {0}")]
    KubeconfigLoad(#[from] kube::config::KubeconfigError),
    #[error("kubeconfig has no context named '{0}'")]
    MissingContext(String),
    #[error("no kubeconfig found - set KUBECONFIG or create ~/.kube/config")]
    NoKubeconfig,
}
