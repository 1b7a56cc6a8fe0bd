use super::clock::Clock;
use super::relay::{EmailMessage, EmailRelay};
use super::types::{Passcode, PasscodeSlot, Verification};
use crate::config::PasscodeConfig;
use crate::error::{BlockerError, Result};
use crate::state::{decode, ProtectionConfig};
use crate::store::{KeyValueStore, StoreMap};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, error, info};

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws `len` characters uniformly from `[A-Z0-9]`.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Issues, stores, delivers and checks passcodes.
///
/// A passcode is written to its slot before delivery is attempted, so a failed
/// send still leaves a valid code in storage that nobody was told about. The
/// caller should report the failure and let the user ask again.
///
/// Verification is a pure read: a correct code keeps working until it expires.
pub struct PasscodeService {
    store: Arc<dyn KeyValueStore>,
    relay: Arc<dyn EmailRelay>,
    clock: Arc<dyn Clock>,
    config: PasscodeConfig,
    product_name: String,
}

impl PasscodeService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        relay: Arc<dyn EmailRelay>,
        clock: Arc<dyn Clock>,
        config: PasscodeConfig,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            relay,
            clock,
            config,
            product_name: product_name.into(),
        }
    }

    pub fn code_length(&self) -> usize {
        self.config.length
    }

    /// Generates a passcode for `slot`, stores it and emails it.
    pub async fn issue(&self, slot: PasscodeSlot) -> Result<Passcode> {
        let protection = ProtectionConfig::load(self.store.as_ref()).await?;
        let email = protection.email.clone().ok_or_else(|| {
            BlockerError::Configuration("No email configured for protection".to_string())
        })?;
        let credentials = match protection.relay {
            Some(ref relay) if relay.is_complete() => relay.clone(),
            _ => {
                return Err(BlockerError::Configuration(
                    "Email relay not configured properly".to_string(),
                ))
            }
        };

        let passcode = Passcode {
            code: generate_code(&mut rand::thread_rng(), self.config.length),
            expires_at: self.clock.now_millis() + self.config.ttl_millis(),
        };

        let mut items = StoreMap::new();
        items.insert(
            slot.storage_key().to_string(),
            serde_json::to_value(&passcode)?,
        );
        self.store.set(items).await?;

        let message = EmailMessage::for_slot(
            slot,
            &email,
            &passcode.code,
            &self.product_name,
            self.config.ttl_minutes,
        );
        if let Err(e) = self.relay.send(&credentials, &message).await {
            error!("Failed to send {:?} passcode: {}", slot, e);
            return Err(e);
        }

        info!("Issued {:?} passcode, valid until {}", slot, passcode.expires_at);
        Ok(passcode)
    }

    /// Reads the passcode currently stored in `slot`.
    pub async fn stored(&self, slot: PasscodeSlot) -> Result<Option<Passcode>> {
        let key = slot.storage_key();
        let data = self.store.get(&[key]).await?;
        decode(&data, key)
    }

    /// Checks `entered` against both slots at time `now_millis`.
    pub async fn verify(&self, entered: &str, now_millis: u64) -> Result<Verification> {
        let keys: Vec<&str> = PasscodeSlot::ALL.iter().map(|s| s.storage_key()).collect();
        let data = self.store.get(&keys).await?;

        let mut outcome = Verification::NoneIssued;
        for slot in PasscodeSlot::ALL {
            let stored: Option<Passcode> = decode(&data, slot.storage_key())?;
            let Some(passcode) = stored else {
                continue;
            };
            if passcode.accepts(entered, now_millis) {
                return Ok(Verification::Valid(slot));
            }
            outcome = match (outcome, passcode.code == entered) {
                (Verification::Expired, _) | (_, true) => Verification::Expired,
                _ => Verification::Mismatched,
            };
        }

        debug!("Passcode verification failed: {:?}", outcome);
        Ok(outcome)
    }

    pub async fn verify_now(&self, entered: &str) -> Result<Verification> {
        self.verify(entered, self.clock.now_millis()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passcode::clock::ManualClock;
    use crate::state::RelayCredentials;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestRelay {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl EmailRelay for TestRelay {
        async fn send(&self, _credentials: &RelayCredentials, message: &EmailMessage) -> Result<()> {
            if self.fail {
                return Err(BlockerError::Delivery {
                    status: Some(503),
                    detail: "unavailable".into(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    async fn configured_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let mut items = StoreMap::new();
        items.insert("protectionEmail".into(), json!("me@example.com"));
        items.insert(
            "relayConfig".into(),
            json!({ "serviceId": "s", "templateId": "t", "publicKey": "k" }),
        );
        store.set(items).await.unwrap();
        store
    }

    fn service(
        store: Arc<MemoryStore>,
        relay: Arc<TestRelay>,
        clock: Arc<ManualClock>,
    ) -> PasscodeService {
        PasscodeService::new(store, relay, clock, PasscodeConfig::default(), "Focus Blocker")
    }

    #[test]
    fn test_generated_codes_use_charset() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let code = generate_code(&mut rng, 6);
            assert_eq!(code.len(), 6);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_issue_stores_then_sends() {
        let store = configured_store().await;
        let relay = Arc::new(TestRelay::default());
        let clock = Arc::new(ManualClock::new(1_000));
        let svc = service(store, relay.clone(), clock);

        let issued = svc.issue(PasscodeSlot::Live).await.unwrap();
        assert_eq!(issued.expires_at, 1_000 + 600_000);
        assert_eq!(svc.stored(PasscodeSlot::Live).await.unwrap(), Some(issued.clone()));
        assert_eq!(svc.stored(PasscodeSlot::Test).await.unwrap(), None);

        let sent = relay.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].passcode, issued.code);
        assert_eq!(sent[0].to_email, "me@example.com");
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_stored_code() {
        let store = configured_store().await;
        let relay = Arc::new(TestRelay {
            fail: true,
            ..TestRelay::default()
        });
        let svc = service(store, relay, Arc::new(ManualClock::new(0)));

        let err = svc.issue(PasscodeSlot::Live).await.unwrap_err();
        assert!(matches!(err, BlockerError::Delivery { status: Some(503), .. }));
        assert!(svc.stored(PasscodeSlot::Live).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_issue_requires_configuration() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), Arc::new(TestRelay::default()), Arc::new(ManualClock::new(0)));
        let err = svc.issue(PasscodeSlot::Live).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: No email configured for protection"
        );

        let mut items = StoreMap::new();
        items.insert("protectionEmail".into(), json!("me@example.com"));
        store.set(items).await.unwrap();
        let err = svc.issue(PasscodeSlot::Test).await.unwrap_err();
        assert!(matches!(err, BlockerError::Configuration(_)));
        assert!(svc.stored(PasscodeSlot::Test).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_boundary_and_slots() {
        let store = configured_store().await;
        let clock = Arc::new(ManualClock::new(0));
        let svc = service(store, Arc::new(TestRelay::default()), clock);

        assert_eq!(svc.verify("ABC123", 0).await.unwrap(), Verification::NoneIssued);

        let live = svc.issue(PasscodeSlot::Live).await.unwrap();
        let test = svc.issue(PasscodeSlot::Test).await.unwrap();

        assert_eq!(
            svc.verify(&live.code, live.expires_at - 1).await.unwrap(),
            Verification::Valid(PasscodeSlot::Live)
        );
        assert_eq!(
            svc.verify(&test.code, 5).await.unwrap(),
            if test.code == live.code {
                Verification::Valid(PasscodeSlot::Live)
            } else {
                Verification::Valid(PasscodeSlot::Test)
            }
        );
        // Reuse within the window is allowed.
        assert!(svc.verify(&live.code, 10).await.unwrap().is_valid());
        // Expiry instant itself is already too late.
        assert_eq!(
            svc.verify(&live.code, live.expires_at).await.unwrap(),
            Verification::Expired
        );
    }

    #[tokio::test]
    async fn test_verify_is_case_sensitive_and_exact() {
        let store = configured_store().await;
        let mut items = StoreMap::new();
        items.insert(
            "currentPasscode".into(),
            json!({ "code": "AB12CD", "expires": 10_000 }),
        );
        store.set(items).await.unwrap();
        let svc = service(store, Arc::new(TestRelay::default()), Arc::new(ManualClock::new(0)));

        assert!(svc.verify("AB12CD", 9_999).await.unwrap().is_valid());
        assert_eq!(svc.verify("ab12cd", 1).await.unwrap(), Verification::Mismatched);
        assert_eq!(svc.verify("AB12C", 1).await.unwrap(), Verification::Mismatched);
        assert_eq!(svc.verify(" AB12CD", 1).await.unwrap(), Verification::Mismatched);
    }

    #[tokio::test]
    async fn test_reissue_overwrites_slot() {
        let store = configured_store().await;
        let svc = service(store, Arc::new(TestRelay::default()), Arc::new(ManualClock::new(0)));

        let first = svc.issue(PasscodeSlot::Live).await.unwrap();
        let second = svc.issue(PasscodeSlot::Live).await.unwrap();
        assert_eq!(svc.stored(PasscodeSlot::Live).await.unwrap(), Some(second.clone()));
        if first.code != second.code {
            assert_eq!(
                svc.verify(&first.code, 1).await.unwrap(),
                Verification::Mismatched
            );
        }
    }
}
