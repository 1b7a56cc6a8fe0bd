use super::types::PasscodeSlot;
use crate::config::RelayConfig;
use crate::error::{BlockerError, Result};
use crate::state::RelayCredentials;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// Template parameters handed to the relay for one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub passcode: String,
    pub message: String,
}

impl EmailMessage {
    pub fn for_slot(
        slot: PasscodeSlot,
        to_email: &str,
        passcode: &str,
        product_name: &str,
        ttl_minutes: u64,
    ) -> Self {
        let (subject, message) = match slot {
            PasscodeSlot::Test => (
                format!("{} - Test Passcode", product_name),
                format!(
                    "Hello!\n\nYour {product} test passcode is: {code}\n\n\
                     This passcode will expire in {ttl} minutes.\n\n\
                     This is a test email to verify your setup is working correctly.\n\n\
                     Stay productive!\n{product}",
                    product = product_name,
                    code = passcode,
                    ttl = ttl_minutes
                ),
            ),
            PasscodeSlot::Live => (
                format!("{} - Unblock Passcode", product_name),
                format!(
                    "Hello!\n\nYour {product} passcode is: {code}\n\n\
                     This passcode will expire in {ttl} minutes.\n\n\
                     Use this code to modify your blocked sites list. \
                     Remember - you requested this to help stay focused!\n\n\
                     Stay productive!\n{product}",
                    product = product_name,
                    code = passcode,
                    ttl = ttl_minutes
                ),
            ),
        };

        Self {
            to_email: to_email.to_string(),
            subject,
            passcode: passcode.to_string(),
            message,
        }
    }
}

/// Outbound transactional email service.
#[async_trait::async_trait]
pub trait EmailRelay: Send + Sync {
    async fn send(&self, credentials: &RelayCredentials, message: &EmailMessage) -> Result<()>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a EmailMessage,
}

/// Relay client that POSTs a JSON send request to a fixed endpoint.
pub struct HttpEmailRelay {
    client: Client,
    endpoint: String,
}

impl HttpEmailRelay {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("FocusBlocker/1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BlockerError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait::async_trait]
impl EmailRelay for HttpEmailRelay {
    async fn send(&self, credentials: &RelayCredentials, message: &EmailMessage) -> Result<()> {
        let body = SendRequest {
            service_id: &credentials.service_id,
            template_id: &credentials.template_id,
            user_id: &credentials.public_key,
            template_params: message,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach relay at {}: {}", self.endpoint, e);
                BlockerError::Delivery {
                    status: None,
                    detail: e.to_string(),
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            error!("Relay rejected send ({}): {}", status, detail);
            return Err(BlockerError::Delivery {
                status: Some(status.as_u16()),
                detail,
            });
        }

        info!("Passcode email accepted by relay for {}", message.to_email);
        Ok(())
    }
}
