pub mod etcd;
pub mod fs;
pub mod git;
pub mod minio;
mod sigv4;

pub use etcd::{ETCD_STATE, EtcdBackend, EtcdProvider};
pub use fs::{FileProvider, FsBackend};
pub use git::{GITLAB_STATE, GitBackend, GitProvider};
pub use minio::{MINIO_STATE, MinioBackend, MinioProvider};

use crate::error::BackendError;

/// Passes successful responses through and turns the rest into [`BackendError::Status`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let endpoint = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        endpoint,
        status: status.as_u16(),
        body,
    })
}

/// Reads a required string field of a stored profile.
pub(crate) fn str_field<'a>(profile: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    profile
        .get(field)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
}
