use thiserror::Error;

/// Failures talking to a remote system while listing or fetching.
///
/// These never reach the presentation layer: explorers turn them into warnings.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} answered {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to decode response: {0}")]
    Decode(String),
    #[error("unable to build request: {0}")]
    Request(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

impl From<quick_xml::DeError> for BackendError {
    fn from(err: quick_xml::DeError) -> Self {
        BackendError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for BackendError {
    fn from(err: base64::DecodeError) -> Self {
        BackendError::Decode(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ExplorerError {
    /// A persisted profile could not be turned into a usable client.
    #[error("invalid profile {profile}: {reason}")]
    ConfigParse { profile: String, reason: String },
    /// A node was asked to bind to a client it cannot build.
    #[error("node '{node}' has no usable backend client: {reason}")]
    InvariantViolation { node: String, reason: String },
    #[error("state storage failure: {0}")]
    Storage(color_eyre::Report),
    #[error("unable to encode profiles: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<color_eyre::Report> for ExplorerError {
    fn from(report: color_eyre::Report) -> Self {
        ExplorerError::Storage(report)
    }
}

pub type Result<T, E = ExplorerError> = std::result::Result<T, E>;
