//! Ticketing API client.
//!
//! `TicketingClient` is the seam the orchestrator calls once per row.
//! Production code uses `HttpTicketingClient`; tests and dry runs use
//! `RecordingTicketingClient`, which keeps every draft in memory.

use crate::config::TicketingConfig;
use crate::error::TicketingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest error body kept from a failed response.
const MAX_ERROR_BODY: usize = 512;

/// One ticket to create: requester e-mail plus resolved title and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    #[serde(rename = "Usuario")]
    pub requester: String,
    #[serde(rename = "Titulo")]
    pub title: String,
    #[serde(rename = "Descricao")]
    pub description: String,
}

impl TicketDraft {
    pub fn new(
        requester: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            requester: requester.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Opaque payload returned by the ticketing system on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketReceipt {
    pub data: serde_json::Value,
}

impl TicketReceipt {
    pub fn empty() -> Self {
        Self {
            data: serde_json::json!({}),
        }
    }
}

/// Creates one ticket per call.
#[async_trait]
pub trait TicketingClient: Send + Sync {
    async fn create_ticket(&self, draft: &TicketDraft) -> Result<TicketReceipt, TicketingError>;
}

/// Minimal e-mail shape check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

// ============================================================================
// HTTP client (production)
// ============================================================================

/// Posts drafts as JSON to the configured endpoint with the shared-secret header.
pub struct HttpTicketingClient {
    http: reqwest::Client,
    endpoint: String,
    api_key_header: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpTicketingClient {
    pub fn new(config: &TicketingConfig) -> Result<Self, TicketingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("helpdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TicketingError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key_header: config.api_key_header.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> TicketingError {
        if e.is_timeout() {
            TicketingError::Timeout(self.timeout_secs)
        } else {
            TicketingError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl TicketingClient for HttpTicketingClient {
    async fn create_ticket(&self, draft: &TicketDraft) -> Result<TicketReceipt, TicketingError> {
        if !is_valid_email(&draft.requester) {
            return Err(TicketingError::InvalidRequester(draft.requester.clone()));
        }

        debug!("POST {} title={:?}", self.endpoint, draft.title);
        let response = self
            .http
            .post(&self.endpoint)
            .header(self.api_key_header.as_str(), self.api_key.as_str())
            .json(draft)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let body: String = text.chars().take(MAX_ERROR_BODY).collect();
            warn!("Ticketing API returned {} for {:?}", status, draft.title);
            return Err(TicketingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("Ticket created: {}", draft.title);
        if body.is_empty() {
            return Ok(TicketReceipt::empty());
        }
        let data = serde_json::from_slice(&body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
        });
        Ok(TicketReceipt { data })
    }
}

// ============================================================================
// Recording client (tests, dry runs)
// ============================================================================

/// In-memory client that records every draft it is given.
///
/// Calls are numbered from 1. A call fails when its number or the draft's
/// title was registered as failing.
#[derive(Default)]
pub struct RecordingTicketingClient {
    drafts: Mutex<Vec<TicketDraft>>,
    failing_calls: HashSet<usize>,
    failing_titles: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingTicketingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_call(mut self, call: usize) -> Self {
        self.failing_calls.insert(call);
        self
    }

    pub fn with_failing_title(mut self, title: impl Into<String>) -> Self {
        self.failing_titles.insert(title.into());
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Drafts received so far, in call order.
    pub fn drafts(&self) -> Vec<TicketDraft> {
        self.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TicketDraft>> {
        self.drafts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TicketingClient for RecordingTicketingClient {
    async fn create_ticket(&self, draft: &TicketDraft) -> Result<TicketReceipt, TicketingError> {
        let call = {
            let mut drafts = self.lock();
            drafts.push(draft.clone());
            drafts.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_calls.contains(&call) || self.failing_titles.contains(&draft.title) {
            return Err(TicketingError::Status {
                status: 500,
                body: format!("simulated failure on call {}", call),
            });
        }

        Ok(TicketReceipt {
            data: serde_json::json!({ "call": call }),
        })
    }
}
