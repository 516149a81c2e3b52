use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{GitHost, MergeRequest, Repository};
use crate::backend::Entry;
use crate::backends::check_status;
use crate::error::BackendError;

#[derive(Debug, Deserialize)]
struct Content {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Branch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Collaborator {
    login: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    html_url: String,
}

/// Gitee REST v5. The token travels as the `access_token` query parameter.
pub struct Gitee {
    client: reqwest::Client,
    origin: Url,
    repository: String,
    token: Option<String>,
}

impl Gitee {
    pub fn new(repository: &Repository) -> Self {
        Gitee {
            client: reqwest::Client::new(),
            origin: repository.origin.clone(),
            repository: repository.path.clone(),
            token: repository.token.clone(),
        }
    }

    /// `api/v5/repos/<owner>/<repo>/<segments...>`; path segments keep their slashes.
    fn repo_url(&self, segments: &[&str]) -> Url {
        let mut url = self.origin.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["api", "v5", "repos"])
                .extend(self.repository.split('/'))
                .extend(
                    segments
                        .iter()
                        .flat_map(|segment| segment.split('/'))
                        .filter(|segment| !segment.is_empty()),
                );
        }
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        url
    }
}

#[async_trait]
impl GitHost for Gitee {
    async fn list_tree(&self, path: &str) -> Result<Vec<Entry>, BackendError> {
        let response = self
            .client
            .get(self.repo_url(&["contents", path]))
            .send()
            .await?;
        let contents: Vec<Content> = check_status(response).await?.json().await?;
        Ok(contents
            .into_iter()
            .map(|content| Entry::new(content.name, content.path, content.kind != "dir"))
            .collect())
    }

    async fn raw_file(&self, path: &str) -> Result<Option<String>, BackendError> {
        let response = self.client.get(self.repo_url(&["raw", path])).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check_status(response).await?.text().await?))
    }

    async fn branches(&self) -> Result<Vec<String>, BackendError> {
        let response = self.client.get(self.repo_url(&["branches"])).send().await?;
        let branches: Vec<Branch> = check_status(response).await?.json().await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn collaborators(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.repo_url(&["collaborators"]))
            .send()
            .await?;
        let collaborators: Vec<Collaborator> = check_status(response).await?.json().await?;
        Ok(collaborators.into_iter().map(|c| c.login).collect())
    }

    async fn create_merge_request(&self, request: &MergeRequest) -> Result<String, BackendError> {
        let body = json!({
            "title": request.title,
            "head": request.source_branch,
            "base": request.target_branch,
        });
        let response = self
            .client
            .post(self.repo_url(&["pulls"]))
            .json(&body)
            .send()
            .await?;
        let created: PullRequest = check_status(response).await?.json().await?;
        Ok(created.html_url)
    }
}
