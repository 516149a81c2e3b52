use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{GitHost, MergeRequest, Repository};
use crate::backend::Entry;
use crate::backends::check_status;
use crate::error::BackendError;

const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct TreeObject {
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
struct Member {
    username: String,
}

#[derive(Debug, Deserialize)]
struct CreatedMergeRequest {
    web_url: String,
}

/// GitLab REST v4.
pub struct GitLab {
    client: reqwest::Client,
    origin: Url,
    project: String,
    token: Option<String>,
}

impl GitLab {
    pub fn new(repository: &Repository) -> Self {
        GitLab {
            client: reqwest::Client::new(),
            origin: repository.origin.clone(),
            project: repository.path.clone(),
            token: repository.token.clone(),
        }
    }

    /// `api/v4/projects/<url-encoded project>/<segments...>`
    fn project_url(&self, segments: &[&str]) -> Url {
        let mut url = self.origin.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["api", "v4", "projects", self.project.as_str()])
                .extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("PRIVATE-TOKEN", token),
            None => request,
        }
    }

    /// Follows `X-Next-Page` until the last page.
    async fn get_all<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Vec<T>, BackendError> {
        let mut items = Vec::new();
        let mut page = String::from("1");
        loop {
            let mut paged = url.clone();
            paged
                .query_pairs_mut()
                .append_pair("per_page", PAGE_SIZE)
                .append_pair("page", &page);
            let response = self.authorized(self.client.get(paged)).send().await?;
            let response = check_status(response).await?;
            let next = response
                .headers()
                .get("x-next-page")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned);
            items.extend(response.json::<Vec<T>>().await?);
            match next {
                Some(next) => page = next,
                None => return Ok(items),
            }
        }
    }
}

#[async_trait]
impl GitHost for GitLab {
    async fn list_tree(&self, path: &str) -> Result<Vec<Entry>, BackendError> {
        let mut url = self.project_url(&["repository", "tree"]);
        if !path.is_empty() {
            url.query_pairs_mut().append_pair("path", path);
        }
        let objects: Vec<TreeObject> = self.get_all(url).await?;
        Ok(objects
            .into_iter()
            .map(|object| Entry::new(object.name, object.path, object.kind == "blob"))
            .collect())
    }

    async fn raw_file(&self, path: &str) -> Result<Option<String>, BackendError> {
        let mut url = self.project_url(&["repository", "files", path, "raw"]);
        url.query_pairs_mut().append_pair("ref", "HEAD");
        let response = self.authorized(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check_status(response).await?.text().await?))
    }

    async fn branches(&self) -> Result<Vec<String>, BackendError> {
        let branches: Vec<Branch> = self
            .get_all(self.project_url(&["repository", "branches"]))
            .await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn collaborators(&self) -> Result<Vec<String>, BackendError> {
        let members: Vec<Member> = self.get_all(self.project_url(&["members", "all"])).await?;
        Ok(members.into_iter().map(|m| m.username).collect())
    }

    async fn create_merge_request(&self, request: &MergeRequest) -> Result<String, BackendError> {
        let body = json!({
            "source_branch": request.source_branch,
            "target_branch": request.target_branch,
            "title": request.title,
        });
        let response = self
            .authorized(self.client.post(self.project_url(&["merge_requests"])))
            .json(&body)
            .send()
            .await?;
        let created: CreatedMergeRequest = check_status(response).await?.json().await?;
        Ok(created.web_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PROJECT: &str = "/api/v4/projects/group%2Frepo";

    fn gitlab(server: &MockServer, token: Option<&str>) -> GitLab {
        let repo = Repository::parse(&format!("{}/group/repo", server.uri()), token).unwrap();
        GitLab::new(&repo)
    }

    #[tokio::test]
    async fn tree_follows_next_page_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PROJECT}/repository/tree")))
            .and(query_param("path", "src"))
            .and(query_param("page", "1"))
            .and(header("PRIVATE-TOKEN", "secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Next-Page", "2")
                    .set_body_json(json!([
                        {"id": "a1", "name": "lib.rs", "type": "blob", "path": "src/lib.rs", "mode": "100644"}
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{PROJECT}/repository/tree")))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Next-Page", "")
                    .set_body_json(json!([
                        {"id": "b2", "name": "bin", "type": "tree", "path": "src/bin", "mode": "040000"}
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let entries = gitlab(&server, Some("secret")).list_tree("src").await.unwrap();
        assert_eq!(
            entries,
            vec![
                Entry::new("lib.rs", "src/lib.rs", true),
                Entry::new("bin", "src/bin", false),
            ]
        );
    }

    #[tokio::test]
    async fn root_tree_sends_no_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PROJECT}/repository/tree")))
            .and(query_param_is_missing("path"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        assert!(gitlab(&server, None).list_tree("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn raw_file_encodes_the_whole_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PROJECT}/repository/files/src%2Flib.rs/raw")))
            .and(query_param("ref", "HEAD"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pub fn f() {}"))
            .mount(&server)
            .await;

        let content = gitlab(&server, None).raw_file("src/lib.rs").await.unwrap();
        assert_eq!(content.as_deref(), Some("pub fn f() {}"));
    }

    #[tokio::test]
    async fn raw_file_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "404 File Not Found"})))
            .mount(&server)
            .await;

        assert_eq!(gitlab(&server, None).raw_file("gone.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn branches_and_members() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PROJECT}/repository/branches")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "main"}, {"name": "dev"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{PROJECT}/members/all")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "username": "alice"}])))
            .mount(&server)
            .await;

        let host = gitlab(&server, None);
        assert_eq!(host.branches().await.unwrap(), vec!["main", "dev"]);
        assert_eq!(host.collaborators().await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn merge_request_returns_web_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{PROJECT}/merge_requests")))
            .and(body_json(json!({"source_branch": "dev", "target_branch": "main", "title": "Release"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"iid": 7, "web_url": "https://gitlab.com/group/repo/-/merge_requests/7"})))
            .expect(1)
            .mount(&server)
            .await;

        let url = gitlab(&server, None)
            .create_merge_request(&MergeRequest {
                source_branch: "dev".to_owned(),
                target_branch: "main".to_owned(),
                title: "Release".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(url, "https://gitlab.com/group/repo/-/merge_requests/7");
    }

    #[tokio::test]
    async fn unauthorized_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("401 Unauthorized"))
            .mount(&server)
            .await;

        let err = gitlab(&server, None).branches().await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 401, .. }));
    }
}
