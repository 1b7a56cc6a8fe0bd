//! Typed views over the shared store: the block list and protection settings.
//!
//! Each type reads its full key subset and writes back everything it owns; there
//! is no partial update and no transaction spanning several types.

use crate::error::Result;
use crate::store::{keys, KeyValueStore, StoreMap};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingState {
    pub popular_sites: Vec<String>,
    pub custom_sites: Vec<String>,
    pub active: bool,
}

impl BlockingState {
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let data = store.get(&keys::BLOCKING_KEYS).await?;
        Ok(Self {
            popular_sites: decode(&data, keys::POPULAR_SITES)?,
            custom_sites: decode(&data, keys::CUSTOM_SITES)?,
            active: decode(&data, keys::BLOCKING_ACTIVE)?,
        })
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let mut items = StoreMap::new();
        items.insert(
            keys::POPULAR_SITES.to_string(),
            serde_json::to_value(&self.popular_sites)?,
        );
        items.insert(
            keys::CUSTOM_SITES.to_string(),
            serde_json::to_value(&self.custom_sites)?,
        );
        items.insert(keys::BLOCKING_ACTIVE.to_string(), Value::Bool(self.active));
        store.set(items).await
    }

    pub fn has_sites(&self) -> bool {
        !self.popular_sites.is_empty() || !self.custom_sites.is_empty()
    }

    /// Sites that should currently be blocked: nothing unless active.
    pub fn effective_sites(&self) -> Vec<String> {
        if !self.active {
            return Vec::new();
        }
        self.popular_sites
            .iter()
            .chain(self.custom_sites.iter())
            .cloned()
            .collect()
    }
}

/// Credentials for the email relay, as entered on the settings surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayCredentials {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub public_key: String,
}

impl RelayCredentials {
    pub fn is_complete(&self) -> bool {
        !self.service_id.is_empty() && !self.template_id.is_empty() && !self.public_key.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectionConfig {
    pub email: Option<String>,
    pub relay: Option<RelayCredentials>,
}

impl ProtectionConfig {
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let data = store.get(&keys::PROTECTION_KEYS).await?;
        let email: Option<String> = decode(&data, keys::PROTECTION_EMAIL)?;
        let relay: Option<RelayCredentials> = decode(&data, keys::RELAY_CONFIG)?;
        Ok(Self {
            email: email.filter(|e| !e.is_empty()),
            relay,
        })
    }

    pub fn relay_complete(&self) -> bool {
        self.relay.as_ref().is_some_and(RelayCredentials::is_complete)
    }

    /// Protection applies only with an email and a complete relay setup.
    pub fn is_enabled(&self) -> bool {
        self.email.is_some() && self.relay_complete()
    }
}

/// Reads `key` from `data`, treating absent or null as the type's default.
pub(crate) fn decode<T: DeserializeOwned + Default>(data: &StoreMap, key: &str) -> Result<T> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => Ok(serde_json::from_value(value.clone())?),
    }
}
