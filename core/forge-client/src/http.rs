//! HTTP implementations of the identity and conversation services.
//!
//! Both endpoints are `GET` with the credential in the `x-auth-token` header.
//! Status mapping:
//! - 401 / 403 → `Unauthorized` (the server's `msg` is kept as detail)
//! - any other non-success → `Status`
//! - connect failure or timeout → `Transport`
//! - undecodable body → `Malformed`

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use skillforge_core::{ConversationService, IdentityService, ServiceError};
use skillforge_protocol::{
    parse_conversations, parse_user, ApiErrorBody, Conversation, UserRef, AUTH_PATH,
    AUTH_TOKEN_HEADER, CONVERSATIONS_PATH,
};
use tracing::{debug, warn};

pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| format!("Failed to build HTTP client: {}", err))?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json(&self, path: &str, token: &str) -> Result<Value, ServiceError> {
        let url = self.endpoint(path);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .header(AUTH_TOKEN_HEADER, token)
            .send()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(map_status(status, &body));
        }
        serde_json::from_str(&body).map_err(|err| ServiceError::Malformed(err.to_string()))
    }
}

impl IdentityService for HttpApi {
    fn restore(&self, token: &str) -> Result<UserRef, ServiceError> {
        let value = self.get_json(AUTH_PATH, token)?;
        Ok(parse_user(&value)?)
    }
}

impl ConversationService for HttpApi {
    fn list(&self, token: &str) -> Result<Vec<Conversation>, ServiceError> {
        let value = self.get_json(CONVERSATIONS_PATH, token)?;
        let batch = parse_conversations(&value)?;
        if batch.skipped > 0 {
            warn!(skipped = batch.skipped, "Skipped undecodable conversation entries");
        }
        Ok(batch.conversations)
    }
}

fn map_status(status: StatusCode, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.text().map(str::to_string))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized(message),
        _ => ServiceError::Status {
            status: status.as_u16(),
            message,
        },
    }
}
