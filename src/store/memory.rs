use super::notify::ChangeNotifier;
use super::traits::{ChangeSet, KeyValueStore, StoreMap};
use crate::error::{BlockerError, Result};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Process-local store. Clones of the handle are not shared; wrap it in an
/// `Arc` to hand the same store to several components.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<FxHashMap<String, Value>>,
    notifier: ChangeNotifier,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FxHashMap<String, Value>>> {
        self.data
            .lock()
            .map_err(|_| BlockerError::Store("memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap> {
        let data = self.lock()?;
        let mut out = StoreMap::new();
        for key in keys {
            if let Some(value) = data.get(*key) {
                out.insert(key.to_string(), value.clone());
            }
        }
        Ok(out)
    }

    async fn set(&self, items: StoreMap) -> Result<()> {
        let mut changes = ChangeSet::new();
        {
            let mut data = self.lock()?;
            for (key, value) in items {
                let old = data.insert(key.clone(), value.clone());
                ChangeNotifier::record(&mut changes, &key, old, Some(value));
            }
        }
        self.notifier.publish(changes);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut changes = ChangeSet::new();
        {
            let mut data = self.lock()?;
            for key in keys {
                let old = data.remove(*key);
                ChangeNotifier::record(&mut changes, key, old, None);
            }
        }
        self.notifier.publish(changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeSet> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> StoreMap {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_only_present_keys() {
        let store = MemoryStore::new();
        store.set(map(json!({ "a": 1, "b": [1, 2] }))).await.unwrap();

        let got = store.get(&["a", "missing"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!(1));
    }

    #[tokio::test]
    async fn test_changes_carry_old_and_new_values() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.set(map(json!({ "blockingActive": true }))).await.unwrap();
        store.set(map(json!({ "blockingActive": false }))).await.unwrap();
        store.remove(&["blockingActive"]).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first["blockingActive"].old_value, None);
        assert_eq!(first["blockingActive"].new_value, Some(json!(true)));

        let second = rx.recv().await.unwrap();
        assert_eq!(second["blockingActive"].old_value, Some(json!(true)));
        assert_eq!(second["blockingActive"].new_value, Some(json!(false)));

        let third = rx.recv().await.unwrap();
        assert_eq!(third["blockingActive"].new_value, None);
    }

    #[tokio::test]
    async fn test_unchanged_writes_are_not_published() {
        let store = MemoryStore::new();
        store.set(map(json!({ "k": "v" }))).await.unwrap();
        let mut rx = store.subscribe();

        store.set(map(json!({ "k": "v" }))).await.unwrap();
        store.remove(&["never-set"]).await.unwrap();
        store.set(map(json!({ "k": "w" }))).await.unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change["k"].new_value, Some(json!("w")));
        assert!(rx.try_recv().is_err());
    }
}
