// Submission transport
//
// One POST per confirmed wizard, no retry. Every backend shape (envelope, raw record,
// bare status) is normalized into `SubmitReceipt` or a `WizardError` here so the
// controller never looks at HTTP.

use crate::error::WizardError;
use crate::host::session::Session;
use crate::models::responses::{ApiResponse, SubmitReceipt};
use crate::security::crypto::token_fingerprint;
use crate::wizard::controller::SubmitTicket;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use url::Url;

pub const UNREACHABLE: &str = "Unable to reach the server. Check your connection and try again.";

#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, ticket: &SubmitTicket) -> Result<SubmitReceipt, WizardError>;
}

pub struct HttpSubmitter {
    client: reqwest::Client,
    base_url: Url,
    session: Session,
}

impl HttpSubmitter {
    pub fn new(base_url: &str, timeout: Duration, session: Session) -> anyhow::Result<Self> {
        let mut base = base_url.trim().to_string();
        // Url::join replaces the last segment unless the base ends with '/'.
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| anyhow::anyhow!("Invalid API base URL '{}': {}", base, e))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, WizardError> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| WizardError::Unexpected(format!("bad endpoint '{}': {}", endpoint, e)))
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, ticket: &SubmitTicket) -> Result<SubmitReceipt, WizardError> {
        let token = self.session.bearer_token()?;
        let url = self.endpoint_url(ticket.endpoint)?;
        let started = Instant::now();
        log::info!(
            "[PHASE: api] [STEP: submit] POST {} entity={} generation={} token_fp={}",
            url,
            ticket.entity.as_id(),
            ticket.generation,
            token_fingerprint(&token)
        );

        let resp = self
            .client
            .post(url.clone())
            .bearer_auth(&token)
            .json(&ticket.payload)
            .send()
            .await
            .map_err(|e| {
                log::error!("[PHASE: api] [STEP: submit] transport error for {}: {}", url, e);
                WizardError::SubmissionFailed(UNREACHABLE.to_string())
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            log::error!("[PHASE: api] [STEP: submit] failed reading body from {}: {}", url, e);
            WizardError::SubmissionFailed(UNREACHABLE.to_string())
        })?;
        log::info!(
            "[PHASE: api] [STEP: submit] HTTP {} in {} ms ({} bytes)",
            status,
            started.elapsed().as_millis(),
            body.len()
        );
        interpret_response(status, &body)
    }
}

/// Normalize a backend reply.
pub fn interpret_response(status: u16, body: &str) -> Result<SubmitReceipt, WizardError> {
    if status == 401 || status == 403 {
        return Err(WizardError::AuthenticationRequired);
    }

    let parsed: Option<Value> = if body.trim().is_empty() {
        None
    } else {
        serde_json::from_str(body).ok()
    };

    // A boolean `success` decides on its own; the rest of the envelope is best effort.
    let success = parsed
        .as_ref()
        .and_then(|v| v.get("success"))
        .and_then(Value::as_bool);
    if let Some(success) = success {
        let envelope = parsed
            .clone()
            .and_then(|v| serde_json::from_value::<ApiResponse<Value>>(v).ok());
        return if success {
            Ok(SubmitReceipt::from_record(envelope.and_then(|e| e.data)))
        } else {
            let text = envelope
                .as_ref()
                .and_then(|e| e.failure_text())
                .unwrap_or_default()
                .to_string();
            Err(WizardError::submission(text))
        };
    }

    if (200..300).contains(&status) {
        return Ok(SubmitReceipt::from_record(parsed));
    }

    let message = parsed.as_ref().and_then(|v| {
        ["error", "message"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    });
    Err(WizardError::submission(
        message.unwrap_or_else(|| format!("Request failed with status {}", status)),
    ))
}

/// Accepts everything and returns an empty receipt (the controller then generates the
/// fallback reference). Used for dry runs and the smoke modes.
#[derive(Debug, Default)]
pub struct OfflineSubmitter {
    accepted: AtomicU64,
}

impl OfflineSubmitter {
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Submitter for OfflineSubmitter {
    async fn submit(&self, ticket: &SubmitTicket) -> Result<SubmitReceipt, WizardError> {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        log::info!(
            "[PHASE: api] [STEP: offline] accepted {} payload ({} top-level keys)",
            ticket.entity.as_id(),
            ticket.payload.as_object().map(|o| o.len()).unwrap_or(0)
        );
        Ok(SubmitReceipt::default())
    }
}
