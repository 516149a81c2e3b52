use color_eyre::eyre::{Result, WrapErr};

#[cfg(feature = "serde_support")]
use serde::{Serialize, de::DeserializeOwned};

/// Key/value state shared by every explorer.
///
/// Values are opaque bytes; explorers store their profile lists as JSON text under a
/// stable, backend-specific key.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync + 'static {
    async fn set_bytes(&self, key: String, value: Vec<u8>) -> Result<()>;
    async fn get_bytes(&self, key: String) -> Result<Option<Vec<u8>>>;
    async fn clear_all(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.get_bytes(key.to_owned()).await? {
            Some(bytes) => {
                let text = String::from_utf8(bytes).wrap_err_with(|| {
                    format!("StateStore: value for key '{}' is not valid UTF-8", key)
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.set_bytes(key.to_owned(), value.into_bytes()).await
    }
}

/// JSON helpers on top of [`StateStore`].
///
/// Kept apart from the base trait so `dyn StateStore` stays usable.
#[cfg(feature = "serde_support")]
#[async_trait::async_trait]
pub trait StateStoreExt: StateStore {
    async fn set_json<S: Serialize + Send + Sync + 'static>(
        &self,
        key: String,
        value: &S,
    ) -> Result<()> {
        let json_bytes = serde_json::to_vec(value).wrap_err_with(|| {
            format!(
                "StateStore: Failed to serialize value for key '{}' to JSON",
                key
            )
        })?;
        self.set_bytes(key, json_bytes).await
    }

    async fn get_json<D: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: String,
    ) -> Result<Option<D>> {
        match self.get_bytes(key.clone()).await? {
            Some(bytes) => {
                let deserialized: D = serde_json::from_slice(&bytes).wrap_err_with(|| {
                    format!(
                        "StateStore: Failed to deserialize JSON value for key '{}'",
                        key
                    )
                })?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }
}

#[cfg(feature = "serde_support")]
impl<T: StateStore + ?Sized> StateStoreExt for T {}
