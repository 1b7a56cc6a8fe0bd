use crate::error::{BlockerError, Result};
use crate::passcode::{Passcode, PasscodeService, PasscodeSlot};
use crate::state::{ProtectionConfig, RelayCredentials};
use crate::store::{keys, KeyValueStore, StoreMap};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Setup,
    Configured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsView {
    pub section: Section,
    pub email: Option<String>,
    pub relay: Option<RelayCredentials>,
    pub notice: Option<String>,
}

/// Backs the settings page: relay credentials, protection email and the test
/// passcode.
pub struct SettingsController {
    store: Arc<dyn KeyValueStore>,
    passcodes: Arc<PasscodeService>,
}

impl SettingsController {
    pub fn new(store: Arc<dyn KeyValueStore>, passcodes: Arc<PasscodeService>) -> Self {
        Self { store, passcodes }
    }

    pub async fn load(&self) -> Result<SettingsView> {
        let protection = ProtectionConfig::load(self.store.as_ref()).await?;
        let (section, notice) = if protection.is_enabled() {
            (Section::Configured, None)
        } else if protection.email.is_some() {
            (
                Section::Setup,
                Some("Please configure relay settings first".to_string()),
            )
        } else {
            (Section::Setup, None)
        };

        Ok(SettingsView {
            section,
            email: protection.email,
            relay: protection.relay,
            notice,
        })
    }

    pub async fn save_relay_config(
        &self,
        service_id: &str,
        template_id: &str,
        public_key: &str,
    ) -> Result<SettingsView> {
        let credentials = RelayCredentials {
            service_id: service_id.trim().to_string(),
            template_id: template_id.trim().to_string(),
            public_key: public_key.trim().to_string(),
        };
        if !credentials.is_complete() {
            return Err(BlockerError::InvalidInput(
                "Please fill in all relay configuration fields".to_string(),
            ));
        }

        let mut items = StoreMap::new();
        items.insert(
            keys::RELAY_CONFIG.to_string(),
            serde_json::to_value(&credentials)?,
        );
        self.store.set(items).await?;
        info!("Relay configuration saved");
        self.load().await
    }

    pub async fn setup_protection(&self, email: &str) -> Result<()> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(BlockerError::InvalidInput(
                "Please enter a valid email address".to_string(),
            ));
        }
        let protection = ProtectionConfig::load(self.store.as_ref()).await?;
        if !protection.relay_complete() {
            return Err(BlockerError::Configuration(
                "Please configure relay settings first".to_string(),
            ));
        }

        let mut items = StoreMap::new();
        items.insert(keys::PROTECTION_EMAIL.to_string(), email.into());
        self.store.set(items).await?;
        info!("Protection enabled for {}", email);
        Ok(())
    }

    /// Drops the protection email; the user has to set protection up again.
    pub async fn change_email(&self) -> Result<()> {
        self.store.remove(&[keys::PROTECTION_EMAIL]).await?;
        info!("Protection email removed");
        Ok(())
    }

    /// Sends a passcode into the test slot and returns it for display.
    pub async fn send_test_passcode(&self) -> Result<Passcode> {
        self.passcodes.issue(PasscodeSlot::Test).await
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("me@example.com"));
        assert!(is_valid_email("first.last@sub.example.co"));
        assert!(!is_valid_email("me@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("me@.com"));
        assert!(!is_valid_email("me@example."));
        assert!(!is_valid_email("me@a.b."));
        assert!(!is_valid_email("me @example.com"));
        assert!(!is_valid_email("me@a@b.com"));
        assert!(!is_valid_email(""));
    }
}
