//! Binds the UI surfaces to persisted state, the rule synchronizer and the
//! passcode gate.

mod prompt;
mod settings;

pub use prompt::{PasscodePrompt, PromptState};
pub use settings::{is_valid_email, Section, SettingsController, SettingsView};

use crate::engine::{ReconcileReport, RuleSynchronizer};
use crate::error::{BlockerError, Result};
use crate::passcode::PasscodeService;
use crate::state::{BlockingState, ProtectionConfig};
use crate::store::{keys, KeyValueStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Setup,
    Blocked,
}

/// Everything the popup needs to render itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupView {
    pub page: Page,
    pub state: BlockingState,
    pub protection_enabled: bool,
    pub catalog: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSite {
    Added,
    AlreadyListed,
}

pub struct StateController {
    store: Arc<dyn KeyValueStore>,
    synchronizer: Arc<RuleSynchronizer>,
    passcodes: Arc<PasscodeService>,
    catalog: Vec<String>,
}

impl StateController {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        synchronizer: Arc<RuleSynchronizer>,
        passcodes: Arc<PasscodeService>,
        catalog: Vec<String>,
    ) -> Self {
        Self {
            store,
            synchronizer,
            passcodes,
            catalog,
        }
    }

    pub async fn state(&self) -> Result<BlockingState> {
        BlockingState::load(self.store.as_ref()).await
    }

    pub async fn protection_enabled(&self) -> Result<bool> {
        Ok(ProtectionConfig::load(self.store.as_ref()).await?.is_enabled())
    }

    /// Reinstalls rules for whatever the store currently says.
    pub async fn reconcile_from_store(&self) -> Result<ReconcileReport> {
        let state = self.state().await?;
        self.synchronizer.reconcile(&state.effective_sites()).await
    }

    /// Loads the popup. Rules are reconciled on every load so a surface never
    /// shows a state the engine does not enforce.
    pub async fn load_view(&self) -> Result<PopupView> {
        let state = self.state().await?;
        let protection_enabled = self.protection_enabled().await?;
        self.synchronizer.reconcile(&state.effective_sites()).await?;

        let page = if state.active && state.has_sites() {
            Page::Blocked
        } else {
            Page::Setup
        };
        Ok(PopupView {
            page,
            state,
            protection_enabled,
            catalog: self.catalog.clone(),
        })
    }

    /// Changes to an active block list need a valid passcode when protection
    /// is configured. Otherwise anything goes.
    async fn authorize(&self, state: &BlockingState, passcode: Option<&str>) -> Result<()> {
        if !state.active || !self.protection_enabled().await? {
            return Ok(());
        }
        let Some(code) = passcode else {
            return Err(BlockerError::PasscodeRejected);
        };
        let verdict = self.passcodes.verify_now(code).await?;
        if verdict.is_valid() {
            Ok(())
        } else {
            debug!("Blocked list change refused: {:?}", verdict);
            Err(BlockerError::PasscodeRejected)
        }
    }

    async fn commit(&self, state: &BlockingState) -> Result<ReconcileReport> {
        state.save(self.store.as_ref()).await?;
        self.synchronizer.reconcile(&state.effective_sites()).await
    }

    /// Turns blocking on for `selected_popular` plus the custom list.
    pub async fn activate(
        &self,
        selected_popular: Vec<String>,
        passcode: Option<&str>,
    ) -> Result<ReconcileReport> {
        let mut state = self.state().await?;
        self.authorize(&state, passcode).await?;

        let selected: Vec<String> = selected_popular
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if selected.is_empty() && state.custom_sites.is_empty() {
            return Err(BlockerError::InvalidInput(
                "Please select at least one site to block!".to_string(),
            ));
        }

        state.popular_sites = selected;
        state.active = true;
        info!(
            "Activating blocking for {} popular and {} custom sites",
            state.popular_sites.len(),
            state.custom_sites.len()
        );
        self.commit(&state).await
    }

    pub async fn add_custom_site(&self, site: &str, passcode: Option<&str>) -> Result<AddSite> {
        let site = site.trim();
        if site.is_empty() {
            return Err(BlockerError::InvalidInput("Site must not be empty".to_string()));
        }

        let mut state = self.state().await?;
        self.authorize(&state, passcode).await?;
        if state.custom_sites.iter().any(|s| s == site) {
            return Ok(AddSite::AlreadyListed);
        }
        state.custom_sites.push(site.to_string());
        self.commit(&state).await?;
        Ok(AddSite::Added)
    }

    /// Returns whether the site was listed.
    pub async fn remove_custom_site(&self, site: &str, passcode: Option<&str>) -> Result<bool> {
        let mut state = self.state().await?;
        self.authorize(&state, passcode).await?;

        let site = site.trim();
        let before = state.custom_sites.len();
        state.custom_sites.retain(|s| s != site);
        if state.custom_sites.len() == before {
            return Ok(false);
        }
        self.commit(&state).await?;
        Ok(true)
    }

    pub async fn set_active(&self, active: bool, passcode: Option<&str>) -> Result<ReconcileReport> {
        let mut state = self.state().await?;
        self.authorize(&state, passcode).await?;
        state.active = active;
        self.commit(&state).await
    }

    /// Stops blocking but keeps the lists for editing.
    pub async fn unlock(&self, passcode: Option<&str>) -> Result<ReconcileReport> {
        self.set_active(false, passcode).await
    }

    /// Clears both lists and stops blocking.
    pub async fn disable_all(&self, passcode: Option<&str>) -> Result<ReconcileReport> {
        let state = self.state().await?;
        self.authorize(&state, passcode).await?;
        info!("Disabling all blocking");
        self.commit(&BlockingState::default()).await
    }

    /// Reconciles whenever another writer changes the block list keys, so the
    /// installed rules follow the store regardless of which surface wrote it.
    pub fn watch(self: Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.store.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(changes) => {
                        if !keys::BLOCKING_KEYS.iter().any(|k| changes.contains_key(*k)) {
                            continue;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} store notifications, reconciling anyway", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
                if let Err(e) = self.reconcile_from_store().await {
                    error!("Reconciliation after store change failed: {}", e);
                }
            }
        })
    }
}
