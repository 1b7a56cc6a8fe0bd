use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Key-value mapping as read from or written to the store.
pub type StoreMap = serde_json::Map<String, Value>;

/// Before and after values of one key. `None` means absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueChange {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Every key touched by a single mutation.
pub type ChangeSet = BTreeMap<String, ValueChange>;

/// Shared, synchronized key-value storage with change notifications.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the present keys among `keys`. Missing keys are simply absent.
    async fn get(&self, keys: &[&str]) -> Result<StoreMap>;

    async fn set(&self, items: StoreMap) -> Result<()>;

    async fn remove(&self, keys: &[&str]) -> Result<()>;

    /// Stream of change sets for mutations from any writer. Mutations that
    /// leave every value as it was are not reported.
    fn subscribe(&self) -> broadcast::Receiver<ChangeSet>;
}
