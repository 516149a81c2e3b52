pub mod context;
pub mod error;
pub mod kubeconfig;
pub mod namespace_switch;
pub mod namespaces;

pub use context::KubeContext;
pub use error::KubeError;
pub use kubeconfig::Kubeconfig;
pub use namespace_switch::{NamespaceSwitch, namespace_from_selection, use_namespace};
pub use namespaces::NamespaceData;
