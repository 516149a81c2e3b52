pub mod backend;
pub mod backends;
pub mod config;
pub mod error;
pub mod explorer;
pub mod interaction;
pub mod language;
pub mod node;
pub mod profiles;
pub mod sequence;
pub mod session;
pub mod tree;

pub use backend::{Backend, BackendHandle, ClientBinding, Connector, Entry};
pub use config::{ConfigChange, SETTINGS_NAMESPACE};
pub use error::{BackendError, ExplorerError};
pub use explorer::{ClusterProvider, Explorer, RemovalOutcome};
pub use interaction::{Clipboard, Interaction, NotifyLevel};
pub use language::language_id;
pub use node::{TreeNode, TreeSource};
pub use profiles::Upsert;
pub use session::Session;
pub use tree::{Activation, Collapsible, Document, TreeItem};
