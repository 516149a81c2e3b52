//! etcd clusters through the v3 JSON gateway.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use crate::backend::{Backend, BackendHandle, ClientBinding, Connector, Entry};
use crate::backends::{check_status, str_field};
use crate::error::{BackendError, ExplorerError, Result};
use crate::explorer::ClusterProvider;
use crate::interaction::{Interaction, NotifyLevel};
use crate::language::PLAINTEXT;
use crate::node::TreeNode;
use crate::tree::{Activation, Document, TreeItem};

pub const ETCD_STATE: &str = "canopy.etcd-explorer";

const ROOT_KEY: &str = "/";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Hosts {
    One(String),
    Many(Vec<String>),
}

impl Hosts {
    fn first(&self) -> Option<&str> {
        match self {
            Hosts::One(hosts) => hosts.split(',').map(str::trim).find(|h| !h.is_empty()),
            Hosts::Many(hosts) => hosts.iter().map(|h| h.trim()).find(|h| !h.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EtcdOptions {
    hosts: Hosts,
}

#[derive(Debug, Serialize)]
struct RangeRequest {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    range_end: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    keys_only: bool,
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

/// End of the key range holding every key that starts with `prefix`.
pub fn prefix_range_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    // Every byte was 0xff: the range runs to the end of the keyspace.
    vec![0]
}

pub struct EtcdBackend {
    client: reqwest::Client,
    range_url: Url,
}

impl EtcdBackend {
    pub fn new(endpoint: Url) -> Result<Self> {
        let range_url = endpoint
            .join("v3/kv/range")
            .map_err(|err| ExplorerError::ConfigParse {
                profile: endpoint.to_string(),
                reason: err.to_string(),
            })?;
        Ok(EtcdBackend {
            client: reqwest::Client::new(),
            range_url,
        })
    }

    /// Builds a client from `{"hosts": "host:port[,host:port]"}` options.
    pub fn from_options(options: &Value) -> Result<Self> {
        let parse_error = |reason: String| ExplorerError::ConfigParse {
            profile: options.to_string(),
            reason,
        };
        let options: EtcdOptions =
            serde_json::from_value(options.clone()).map_err(|err| parse_error(err.to_string()))?;
        let host = options
            .hosts
            .first()
            .ok_or_else(|| parse_error("no hosts given".to_owned()))?;
        let address = if host.contains("://") {
            host.to_owned()
        } else {
            format!("http://{host}")
        };
        let endpoint = Url::parse(&address).map_err(|err| parse_error(err.to_string()))?;
        if endpoint.host_str().is_none() {
            return Err(parse_error(format!("{address} has no host")));
        }
        Self::new(endpoint)
    }

    async fn range(&self, request: &RangeRequest) -> Result<RangeResponse, BackendError> {
        let response = self
            .client
            .post(self.range_url.clone())
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<RangeResponse>().await?)
    }

    /// Every key starting with `prefix`, in key order.
    pub async fn keys(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let request = RangeRequest {
            key: STANDARD.encode(prefix),
            range_end: Some(STANDARD.encode(prefix_range_end(prefix.as_bytes()))),
            keys_only: true,
        };
        let response = self.range(&request).await?;
        response
            .kvs
            .into_iter()
            .map(|kv| {
                let key = STANDARD.decode(kv.key)?;
                Ok(String::from_utf8_lossy(&key).into_owned())
            })
            .collect()
    }

    pub async fn value(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let request = RangeRequest {
            key: STANDARD.encode(key),
            range_end: None,
            keys_only: false,
        };
        let response = self.range(&request).await?;
        match response.kvs.into_iter().next() {
            Some(KeyValue {
                value: Some(value), ..
            }) => Ok(Some(STANDARD.decode(value)?)),
            // The gateway omits empty values.
            Some(KeyValue { value: None, .. }) => Ok(Some(Vec::new())),
            None => Ok(None),
        }
    }
}

/// JSON values are shown as JSON, anything else base64-encoded.
fn render_value(bytes: &[u8]) -> Document {
    if serde_json::from_slice::<Value>(bytes).is_ok() {
        Document::new("json", String::from_utf8_lossy(bytes))
    } else {
        Document::new(PLAINTEXT, STANDARD.encode(bytes))
    }
}

#[async_trait]
impl Backend for EtcdBackend {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, BackendError> {
        let keys = self.keys(path).await?;
        Ok(keys
            .into_iter()
            .map(|key| Entry::new(key.clone(), key, true))
            .collect())
    }

    async fn fetch(&self, path: &str) -> Result<Option<Document>, BackendError> {
        Ok(self.value(path).await?.map(|bytes| render_value(&bytes)))
    }

    fn tree_item(&self, name: &str, _path: &str, leaf: bool) -> TreeItem {
        TreeItem::new(name, leaf).with_activation(Activation::GetKeyValue)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EtcdProvider;

impl Connector for EtcdProvider {
    fn connect(&self, options: &Value) -> Result<BackendHandle> {
        Ok(Arc::new(EtcdBackend::from_options(options)?))
    }
}

#[async_trait]
impl ClusterProvider for EtcdProvider {
    type Node = TreeNode;

    fn title(&self) -> &'static str {
        "etcd"
    }

    fn storage_key(&self) -> Option<&'static str> {
        Some(ETCD_STATE)
    }

    fn name(&self, profile: &Value) -> String {
        str_field(profile, "name")
            .map(str::to_owned)
            .unwrap_or_else(|| profile.to_string())
    }

    fn is_valid(&self, profile: &Value) -> bool {
        str_field(profile, "name").is_some()
            && profile.get("options").is_some_and(|options| !options.is_null())
    }

    fn merge(&self, existing: &mut Value, incoming: &Value) {
        existing["options"] = incoming["options"].clone();
    }

    async fn connect(&self, profile: &Value, ui: Arc<dyn Interaction>) -> Result<TreeNode> {
        let options = profile.get("options").cloned().unwrap_or_else(|| json!({}));
        let handle = Connector::connect(self, &options)?;
        TreeNode::new(
            self.name(profile),
            ROOT_KEY,
            false,
            ClientBinding::Bound(handle),
            self,
            ui,
        )
    }

    async fn prompt_profile(&self, ui: &dyn Interaction) -> Option<Value> {
        let hosts = ui
            .input(
                "Please specify hosts of the existing cluster:",
                "127.0.0.1:2379",
            )
            .await
            .filter(|hosts| !hosts.trim().is_empty());
        let Some(hosts) = hosts else {
            ui.notify(NotifyLevel::Error, "Cluster hosts is required.");
            return None;
        };
        let name = ui
            .input("Please specify the cluster name:", &hosts)
            .await
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| hosts.clone());
        Some(json!({ "name": name, "options": { "hosts": hosts } }))
    }
}
