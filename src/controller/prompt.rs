use crate::api::{Dispatcher, Message};
use crate::error::Result;
use crate::passcode::PasscodeService;
use std::sync::Arc;

/// Visible state of the passcode modal. Independent of the passcode
/// lifecycle's own states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptState {
    Hidden,
    AwaitingInput,
    Verifying,
    Error(String),
}

/// The modal shown before a protected change.
pub struct PasscodePrompt {
    passcodes: Arc<PasscodeService>,
    dispatcher: Arc<Dispatcher>,
    state: PromptState,
    notice: Option<String>,
}

impl PasscodePrompt {
    pub fn new(passcodes: Arc<PasscodeService>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            passcodes,
            dispatcher,
            state: PromptState::Hidden,
            notice: None,
        }
    }

    pub fn state(&self) -> &PromptState {
        &self.state
    }

    /// Informational text, e.g. after a new passcode was sent.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn open(&mut self) {
        self.notice = None;
        self.state = PromptState::AwaitingInput;
    }

    pub fn cancel(&mut self) {
        self.notice = None;
        self.state = PromptState::Hidden;
    }

    /// Checks the entered code. On success the prompt closes and the accepted
    /// code is returned so the caller can pass it on with the change.
    pub async fn submit(&mut self, input: &str) -> Result<Option<String>> {
        let entered = input.trim();
        let expected_len = self.passcodes.code_length();
        if entered.chars().count() != expected_len {
            self.state = PromptState::Error(format!(
                "Please enter a {}-character passcode",
                expected_len
            ));
            return Ok(None);
        }

        self.state = PromptState::Verifying;
        match self.passcodes.verify_now(entered).await {
            Ok(verdict) if verdict.is_valid() => {
                self.state = PromptState::Hidden;
                Ok(Some(entered.to_string()))
            }
            Ok(_) => {
                self.state = PromptState::Error("Invalid or expired passcode".to_string());
                Ok(None)
            }
            Err(e) => {
                self.state = PromptState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Asks the backend to email a fresh live passcode.
    pub async fn request_new(&mut self) -> bool {
        let resp = self.dispatcher.handle(Message::RequestPasscode).await;
        if resp.success {
            self.state = PromptState::AwaitingInput;
            self.notice = Some("New passcode sent to your email! Check your inbox.".to_string());
            true
        } else {
            let reason = resp
                .error
                .unwrap_or_else(|| "Unknown error occurred".to_string());
            self.state = PromptState::Error(format!("Failed to send: {}", reason));
            false
        }
    }
}
