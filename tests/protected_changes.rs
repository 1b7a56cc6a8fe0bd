use focus_blocker::api::Dispatcher;
use focus_blocker::config::Config;
use focus_blocker::controller::{
    AddSite, Page, PasscodePrompt, PromptState, Section, SettingsController, StateController,
};
use focus_blocker::engine::{MemoryRuleEngine, RuleSynchronizer};
use focus_blocker::error::{BlockerError, Result};
use focus_blocker::passcode::{EmailMessage, EmailRelay, ManualClock, PasscodeService, PasscodeSlot};
use focus_blocker::state::{BlockingState, RelayCredentials};
use focus_blocker::store::{KeyValueStore, MemoryStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingRelay {
    sent: Mutex<Vec<EmailMessage>>,
    down: AtomicBool,
}

impl RecordingRelay {
    fn last_code(&self) -> String {
        self.sent.lock().unwrap().last().unwrap().passcode.clone()
    }
}

#[async_trait::async_trait]
impl EmailRelay for RecordingRelay {
    async fn send(&self, _credentials: &RelayCredentials, message: &EmailMessage) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(BlockerError::Delivery {
                status: Some(500),
                detail: "relay down".into(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    engine: Arc<MemoryRuleEngine>,
    clock: Arc<ManualClock>,
    relay: Arc<RecordingRelay>,
    passcodes: Arc<PasscodeService>,
    dispatcher: Arc<Dispatcher>,
    controller: Arc<StateController>,
    settings: SettingsController,
}

fn harness() -> Harness {
    let config = Config::default();
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(MemoryRuleEngine::new());
    let clock = Arc::new(ManualClock::new(0));
    let relay = Arc::new(RecordingRelay::default());
    let synchronizer = Arc::new(RuleSynchronizer::new(engine.clone(), config.rules.clone()));
    let passcodes = Arc::new(PasscodeService::new(
        store.clone(),
        relay.clone(),
        clock.clone(),
        config.passcode.clone(),
        config.relay.product_name.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(synchronizer.clone(), passcodes.clone()));
    let controller = Arc::new(StateController::new(
        store.clone(),
        synchronizer,
        passcodes.clone(),
        config.popular_sites.clone(),
    ));
    let settings = SettingsController::new(store.clone(), passcodes.clone());
    Harness {
        store,
        engine,
        clock,
        relay,
        passcodes,
        dispatcher,
        controller,
        settings,
    }
}

async fn enable_protection(h: &Harness) {
    h.settings
        .save_relay_config(" service_1 ", "template_1", "public_key")
        .await
        .unwrap();
    h.settings.setup_protection("me@example.com").await.unwrap();
}

#[tokio::test]
async fn test_settings_setup_flow() {
    let h = harness();
    assert_eq!(h.settings.load().await.unwrap().section, Section::Setup);

    // Relay first, then the email.
    let err = h.settings.setup_protection("me@example.com").await.unwrap_err();
    assert!(matches!(err, BlockerError::Configuration(_)));
    let err = h
        .settings
        .save_relay_config("svc", "", "key")
        .await
        .unwrap_err();
    assert!(matches!(err, BlockerError::InvalidInput(_)));
    let err = h.settings.setup_protection("not-an-email").await.unwrap_err();
    assert!(matches!(err, BlockerError::InvalidInput(_)));

    enable_protection(&h).await;
    let view = h.settings.load().await.unwrap();
    assert_eq!(view.section, Section::Configured);
    assert_eq!(view.email.as_deref(), Some("me@example.com"));
    assert_eq!(view.relay.unwrap().service_id, "service_1");

    let test_code = h.settings.send_test_passcode().await.unwrap();
    assert_eq!(h.relay.last_code(), test_code.code);
    assert!(h.relay.sent.lock().unwrap()[0].subject.ends_with("Test Passcode"));

    h.settings.change_email().await.unwrap();
    let view = h.settings.load().await.unwrap();
    assert_eq!(view.section, Section::Setup);
    assert!(view.email.is_none());
}

#[tokio::test]
async fn test_active_list_changes_require_passcode() {
    let h = harness();
    enable_protection(&h).await;
    h.controller
        .activate(vec!["youtube.com".to_string()], None)
        .await
        .unwrap();
    assert_eq!(h.controller.load_view().await.unwrap().page, Page::Blocked);

    // No code, wrong code.
    let err = h.controller.unlock(None).await.unwrap_err();
    assert!(matches!(err, BlockerError::PasscodeRejected));
    let err = h.controller.disable_all(Some("WRONG1")).await.unwrap_err();
    assert!(matches!(err, BlockerError::PasscodeRejected));
    assert_eq!(h.engine.snapshot().len(), 3);

    // A live code unlocks, and keeps working within its window.
    h.passcodes.issue(PasscodeSlot::Live).await.unwrap();
    let code = h.relay.last_code();
    h.controller.unlock(Some(code.as_str())).await.unwrap();
    assert!(h.engine.snapshot().is_empty());

    let view = h.controller.load_view().await.unwrap();
    assert_eq!(view.page, Page::Setup);
    assert_eq!(view.state.popular_sites, vec!["youtube.com"]);
    assert!(view.protection_enabled);

    // Inactive lists can be edited freely.
    assert_eq!(
        h.controller.add_custom_site("news", None).await.unwrap(),
        AddSite::Added
    );
    assert_eq!(
        h.controller.add_custom_site(" news ", None).await.unwrap(),
        AddSite::AlreadyListed
    );
    assert!(h.controller.remove_custom_site(" news ", None).await.unwrap());
    assert!(h.controller.state().await.unwrap().custom_sites.is_empty());
}

#[tokio::test]
async fn test_test_slot_code_also_unlocks() {
    let h = harness();
    enable_protection(&h).await;
    h.controller
        .activate(vec!["reddit.com".to_string()], None)
        .await
        .unwrap();

    let test_code = h.settings.send_test_passcode().await.unwrap();
    h.controller
        .disable_all(Some(test_code.code.as_str()))
        .await
        .unwrap();

    let state = h.controller.state().await.unwrap();
    assert_eq!(state, BlockingState::default());
    assert!(h.engine.snapshot().is_empty());
}

#[tokio::test]
async fn test_expired_code_is_refused() {
    let h = harness();
    enable_protection(&h).await;
    h.controller
        .activate(vec!["x.com".to_string()], None)
        .await
        .unwrap();
    h.passcodes.issue(PasscodeSlot::Live).await.unwrap();
    let code = h.relay.last_code();

    h.clock.advance(Duration::from_secs(11 * 60));
    let err = h
        .controller
        .remove_custom_site("anything", Some(code.as_str()))
        .await
        .unwrap_err();
    assert!(matches!(err, BlockerError::PasscodeRejected));
}

#[tokio::test]
async fn test_activation_needs_a_site() {
    let h = harness();
    let err = h.controller.activate(vec![" ".to_string()], None).await.unwrap_err();
    assert!(matches!(err, BlockerError::InvalidInput(_)));
    assert!(!h.controller.state().await.unwrap().active);
}

#[tokio::test]
async fn test_prompt_state_machine() {
    let h = harness();
    enable_protection(&h).await;
    let mut prompt = PasscodePrompt::new(h.passcodes.clone(), h.dispatcher.clone());
    assert_eq!(prompt.state(), &PromptState::Hidden);

    prompt.open();
    assert_eq!(prompt.state(), &PromptState::AwaitingInput);

    assert_eq!(prompt.submit("ABC").await.unwrap(), None);
    assert_eq!(
        prompt.state(),
        &PromptState::Error("Please enter a 6-character passcode".to_string())
    );

    assert!(prompt.request_new().await);
    assert_eq!(prompt.state(), &PromptState::AwaitingInput);
    assert!(prompt.notice().is_some());
    let code = h.relay.last_code();

    let wrong = if code == "ZZZZZZ" { "YYYYYY" } else { "ZZZZZZ" };
    assert_eq!(prompt.submit(wrong).await.unwrap(), None);
    assert_eq!(
        prompt.state(),
        &PromptState::Error("Invalid or expired passcode".to_string())
    );

    assert_eq!(prompt.submit(&code).await.unwrap(), Some(code.clone()));
    assert_eq!(prompt.state(), &PromptState::Hidden);

    h.relay.down.store(true, Ordering::SeqCst);
    prompt.open();
    assert!(!prompt.request_new().await);
    match prompt.state() {
        PromptState::Error(msg) => assert!(msg.starts_with("Failed to send: Relay API error: 500")),
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_watcher_follows_external_writes() {
    let h = harness();
    let watcher = h.controller.clone().watch();

    // Another surface (or device) writes the state directly.
    BlockingState {
        popular_sites: vec![],
        custom_sites: vec!["news".to_string()],
        active: true,
    }
    .save(h.store.as_ref())
    .await
    .unwrap();

    let mut installed = Vec::new();
    for _ in 0..50 {
        installed = h.engine.patterns();
        if !installed.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(installed, vec!["*://*news*/*"]);

    let mut items = focus_blocker::store::StoreMap::new();
    items.insert("blockingActive".into(), false.into());
    h.store.set(items).await.unwrap();

    let mut cleared = false;
    for _ in 0..50 {
        if h.engine.snapshot().is_empty() {
            cleared = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(cleared, "rules should follow blockingActive = false");

    watcher.abort();
}
