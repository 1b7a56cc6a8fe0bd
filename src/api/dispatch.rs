use crate::engine::RuleSynchronizer;
use crate::passcode::{PasscodeService, PasscodeSlot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Requests the UI surfaces send to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    UpdateBlockedSites { sites: Vec<String> },
    RequestPasscode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Routes surface messages to the synchronizer and the passcode service.
/// Each call resolves only once the underlying work has finished.
pub struct Dispatcher {
    synchronizer: Arc<RuleSynchronizer>,
    passcodes: Arc<PasscodeService>,
}

impl Dispatcher {
    pub fn new(synchronizer: Arc<RuleSynchronizer>, passcodes: Arc<PasscodeService>) -> Self {
        Self {
            synchronizer,
            passcodes,
        }
    }

    pub async fn handle(&self, message: Message) -> MessageResponse {
        match message {
            Message::UpdateBlockedSites { sites } => {
                match self.synchronizer.reconcile(&sites).await {
                    Ok(_) => MessageResponse::ok(),
                    Err(e) => {
                        error!("Error updating rules: {}", e);
                        MessageResponse::failed(e)
                    }
                }
            }
            Message::RequestPasscode => match self.passcodes.issue(PasscodeSlot::Live).await {
                Ok(_) => MessageResponse::ok(),
                Err(e) => {
                    error!("Failed to send passcode: {}", e);
                    MessageResponse::failed(e)
                }
            },
        }
    }
}
