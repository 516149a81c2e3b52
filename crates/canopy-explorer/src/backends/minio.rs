//! MinIO (and other S3-compatible) object stores.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt, stream};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::backend::{Backend, BackendHandle, ClientBinding, Connector, Entry};
use crate::backends::sigv4::{self, Credentials, uri_encode};
use crate::backends::{check_status, str_field};
use crate::error::{BackendError, ExplorerError, Result};
use crate::explorer::ClusterProvider;
use crate::interaction::{Interaction, NotifyLevel};
use crate::language::PLAINTEXT;
use crate::node::TreeNode;
use crate::sequence::{read_to_buffer, read_to_list};
use crate::tree::{Activation, Document, TreeItem};

pub const MINIO_STATE: &str = "canopy.minio-explorer";

const DEFAULT_PORT: u16 = 9000;
const TLS_PORT: u16 = 443;
const DELIMITER: &str = "/";

/// Normalizes a stored `endPoint` into the service origin.
///
/// `https` endpoints always use port 443; anything else uses the given port or 9000.
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let parse_error = |reason: String| ExplorerError::ConfigParse {
        profile: raw.to_owned(),
        reason,
    };
    let raw = raw.trim();
    let address = if raw.contains("://") {
        raw.to_owned()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&address).map_err(|err| parse_error(err.to_string()))?;
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| parse_error("no host in endpoint".to_owned()))?;
    let origin = if url.scheme() == "https" {
        format!("https://{host}:{TLS_PORT}/")
    } else {
        format!("http://{host}:{}/", url.port().unwrap_or(DEFAULT_PORT))
    };
    Url::parse(&origin).map_err(|err| parse_error(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListAllMyBucketsResult {
    #[serde(default)]
    buckets: Buckets,
}

#[derive(Debug, Default, Deserialize)]
struct Buckets {
    #[serde(rename = "Bucket", default)]
    bucket: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<Object>,
    #[serde(default)]
    common_prefixes: Vec<CommonPrefix>,
    #[serde(default)]
    is_truncated: bool,
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Object {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommonPrefix {
    prefix: String,
}

/// One item of a delimited object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectItem {
    Prefix(String),
    Object(String),
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

pub struct MinioBackend {
    client: reqwest::Client,
    endpoint: Url,
    credentials: Option<Credentials>,
}

impl MinioBackend {
    pub fn new(endpoint: Url, access_key: &str, secret_key: &str) -> Self {
        let credentials = (!access_key.is_empty() || !secret_key.is_empty()).then(|| Credentials {
            access_key: access_key.to_owned(),
            secret_key: secret_key.to_owned(),
        });
        MinioBackend {
            client: reqwest::Client::new(),
            endpoint,
            credentials,
        }
    }

    pub fn from_profile(profile: &Value) -> Result<Self> {
        let endpoint = str_field(profile, "endPoint").ok_or_else(|| ExplorerError::ConfigParse {
            profile: profile.to_string(),
            reason: "missing endPoint".to_owned(),
        })?;
        Ok(Self::new(
            parse_endpoint(endpoint)?,
            str_field(profile, "accessKey").unwrap_or_default(),
            str_field(profile, "secretKey").unwrap_or_default(),
        ))
    }

    /// Builds a (signed) request for `/<bucket>/<key>?<query>`.
    fn request(
        &self,
        method: Method,
        bucket: Option<&str>,
        key: Option<&str>,
        query: &[(&str, &str)],
    ) -> Result<RequestBuilder, BackendError> {
        if bucket.into_iter().chain(key).any(has_dot_segment) {
            return Err(BackendError::Request(format!(
                "object path {}/{} has a '.' or '..' segment",
                bucket.unwrap_or_default(),
                key.unwrap_or_default()
            )));
        }
        let mut path = String::from("/");
        if let Some(bucket) = bucket {
            path.push_str(&uri_encode(bucket, true));
            path.push('/');
        }
        if let Some(key) = key {
            path.push_str(&uri_encode(key, false));
        }
        let mut query: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect();
        query.sort();

        let mut url = self
            .endpoint
            .join(&path)
            .map_err(|err| BackendError::Request(err.to_string()))?;
        if !query.is_empty() {
            url.set_query(Some(&query.join("&")));
        }

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(credentials) = &self.credentials {
            for (name, value) in sigv4::sign(method.as_str(), &url, credentials, chrono::Utc::now())? {
                request = request.header(name, value);
            }
        }
        Ok(request)
    }

    pub async fn list_buckets(&self) -> Result<Vec<String>, BackendError> {
        let response = self.request(Method::GET, None, None, &[])?.send().await?;
        let body = check_status(response).await?.text().await?;
        let result: ListAllMyBucketsResult = quick_xml::de::from_str(&body)?;
        Ok(result.buckets.bucket.into_iter().map(|b| b.name).collect())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListBucketResult, BackendError> {
        let mut query = vec![
            ("list-type", "2"),
            ("delimiter", DELIMITER),
            ("prefix", prefix),
        ];
        if let Some(token) = continuation {
            query.push(("continuation-token", token));
        }
        let response = self
            .request(Method::GET, Some(bucket), None, &query)?
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        Ok(quick_xml::de::from_str(&body)?)
    }

    /// Delimited listing under `prefix`, following continuation tokens lazily.
    pub fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
    ) -> impl Stream<Item = Result<ObjectItem, BackendError>> + Send + 'a {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let token = match cursor {
                Cursor::Done => return Ok::<_, BackendError>(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };
            let page = self
                .list_objects_page(bucket, prefix, token.as_deref())
                .await?;
            let next = match page.next_continuation_token {
                Some(token) if page.is_truncated => Cursor::Next(token),
                _ => Cursor::Done,
            };
            let items = page
                .common_prefixes
                .into_iter()
                .map(|p| ObjectItem::Prefix(p.prefix))
                .chain(page.contents.into_iter().map(|o| ObjectItem::Object(o.key)))
                .map(Ok);
            Ok(Some((stream::iter(items.collect::<Vec<_>>()), next)))
        })
        .try_flatten()
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let response = self
            .request(Method::GET, Some(bucket), Some(key), &[])?
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(read_to_buffer(response.bytes_stream()).await?))
    }
}

/// URL resolution would collapse `.`/`..` and address a different object.
fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "." || segment == "..")
}

/// Splits a node path into bucket and object prefix/key.
fn split_path(path: &str) -> Option<(&str, &str)> {
    path.split_once('/').filter(|(bucket, _)| !bucket.is_empty())
}

#[async_trait]
impl Backend for MinioBackend {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, BackendError> {
        let Some((bucket, prefix)) = split_path(path) else {
            let buckets = self.list_buckets().await?;
            return Ok(buckets
                .into_iter()
                .map(|bucket| Entry::new(bucket.clone(), format!("{bucket}/"), false))
                .collect());
        };

        let (items, failure) = read_to_list(self.list_objects(bucket, prefix)).await;
        if let Some(err) = failure {
            tracing::warn!(
                "Listing {}/{} stopped after {} items",
                bucket,
                prefix,
                items.len()
            );
            return Err(err);
        }
        Ok(items
            .into_iter()
            .filter_map(|item| {
                let (key, leaf) = match item {
                    ObjectItem::Prefix(key) => (key, false),
                    ObjectItem::Object(key) => (key, true),
                };
                // Folder placeholder objects list themselves.
                let name = key.strip_prefix(prefix).unwrap_or(&key);
                if name.is_empty() {
                    return None;
                }
                Some(Entry::new(name, format!("{bucket}/{key}"), leaf))
            })
            .collect())
    }

    async fn fetch(&self, path: &str) -> Result<Option<Document>, BackendError> {
        let Some((bucket, key)) = split_path(path).filter(|(_, key)| !key.is_empty()) else {
            return Ok(None);
        };
        let bytes = self.get_object(bucket, key).await?;
        Ok(bytes.map(|bytes| Document::new(PLAINTEXT, String::from_utf8_lossy(&bytes))))
    }

    fn tree_item(&self, name: &str, _path: &str, leaf: bool) -> TreeItem {
        let item = TreeItem::new(name, leaf);
        if leaf {
            item.with_activation(Activation::GetContent)
        } else {
            item
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MinioProvider;

impl Connector for MinioProvider {
    fn connect(&self, options: &Value) -> Result<BackendHandle> {
        Ok(Arc::new(MinioBackend::from_profile(options)?))
    }
}

#[async_trait]
impl ClusterProvider for MinioProvider {
    type Node = TreeNode;

    fn title(&self) -> &'static str {
        "minio"
    }

    fn storage_key(&self) -> Option<&'static str> {
        Some(MINIO_STATE)
    }

    fn name(&self, profile: &Value) -> String {
        str_field(profile, "endPoint")
            .map(str::to_owned)
            .unwrap_or_else(|| profile.to_string())
    }

    fn is_valid(&self, profile: &Value) -> bool {
        str_field(profile, "endPoint").is_some()
    }

    fn merge(&self, existing: &mut Value, incoming: &Value) {
        for field in ["accessKey", "secretKey"] {
            existing[field] = incoming.get(field).cloned().unwrap_or(Value::Null);
        }
    }

    async fn connect(&self, profile: &Value, ui: Arc<dyn Interaction>) -> Result<TreeNode> {
        let handle = Connector::connect(self, profile)?;
        TreeNode::new(
            self.name(profile),
            "",
            false,
            ClientBinding::Bound(handle),
            self,
            ui,
        )
    }

    async fn prompt_profile(&self, ui: &dyn Interaction) -> Option<Value> {
        let endpoint = ui
            .input(
                "Please specify endpoint of the existing cluster:",
                "127.0.0.1:9000",
            )
            .await
            .filter(|endpoint| !endpoint.trim().is_empty());
        let Some(endpoint) = endpoint else {
            ui.notify(NotifyLevel::Error, "Cluster endpoint is required.");
            return None;
        };
        let credential = ui
            .input("Please specify the accesskey/secretkey:", "accessKey:secretKey")
            .await
            .unwrap_or_default();
        let (access_key, secret_key) = credential.split_once(':').unwrap_or((credential.as_str(), ""));
        Some(json!({
            "endPoint": endpoint.trim(),
            "accessKey": access_key,
            "secretKey": secret_key,
        }))
    }
}
