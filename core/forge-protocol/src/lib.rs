//! Wire types for the SkillForge API.
//!
//! This crate is shared by the client core and the HTTP adapters so the shape
//! of identity and conversation payloads is defined once. The API is the
//! authority on these documents; clients decode them leniently because a
//! poll must never fail on one odd conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Label shown in place of the text of a media-only message.
pub const MEDIA_FALLBACK_LABEL: &str = "Sent you an image";

/// Header carrying the credential token on authenticated requests.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Path of the identity endpoint (returns the current user).
pub const AUTH_PATH: &str = "/api/auth";

/// Path of the conversation list endpoint.
pub const CONVERSATIONS_PATH: &str = "/api/messages/conversations";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserRef {
    /// First character of the username, upper-cased; used as avatar fallback.
    pub fn initial(&self) -> Option<String> {
        self.username
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
    }
}

/// The most recent message of a conversation as embedded in the list payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "media", skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl LastMessage {
    /// Text content, or `None` for media-only messages (empty text counts as absent).
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
    }

    pub fn display_content(&self) -> &str {
        self.text().unwrap_or(MEDIA_FALLBACK_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_user")]
    pub user: UserRef,
    #[serde(default, deserialize_with = "lenient_last_message")]
    pub last_message: Option<LastMessage>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub unread_count: u32,
}

/// Result of decoding one conversation list payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationBatch {
    pub conversations: Vec<Conversation>,
    /// Entries dropped because they lacked an id, repeated one, or did not decode.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadError {
    pub code: String,
    pub message: String,
}

impl PayloadError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Decodes a conversation list.
///
/// Accepts a bare array or an object wrapping it under `conversations`.
/// Individual entries that fail to decode are skipped, never fatal; only a
/// payload with no list at all is an error. The first occurrence of an id wins.
pub fn parse_conversations(value: &Value) -> Result<ConversationBatch, PayloadError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("conversations") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(PayloadError::new(
                    "missing_conversations",
                    "payload object has no conversations array",
                ))
            }
        },
        _ => {
            return Err(PayloadError::new(
                "invalid_payload",
                "conversation payload must be an array",
            ))
        }
    };

    let mut batch = ConversationBatch::default();
    let mut seen = HashSet::new();
    for entry in entries {
        match serde_json::from_value::<Conversation>(entry.clone()) {
            Ok(conversation) if conversation.id.trim().is_empty() => batch.skipped += 1,
            Ok(conversation) => {
                if seen.insert(conversation.id.clone()) {
                    batch.conversations.push(conversation);
                } else {
                    batch.skipped += 1;
                }
            }
            Err(_) => batch.skipped += 1,
        }
    }
    Ok(batch)
}

/// Decodes the identity endpoint response. Some deployments wrap the user
/// under `user`; both shapes are accepted.
pub fn parse_user(value: &Value) -> Result<UserRef, PayloadError> {
    let candidate = match value.get("user") {
        Some(inner @ Value::Object(_)) => inner,
        _ => value,
    };
    let user: UserRef = serde_json::from_value(candidate.clone())
        .map_err(|err| PayloadError::new("invalid_user", err.to_string()))?;
    if user.id.trim().is_empty() {
        return Err(PayloadError::new("invalid_user", "user payload has no id"));
    }
    Ok(user)
}

/// Error body returned by the API (`{ "msg": ... }` or `{ "message": ... }`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.msg.as_deref().or(self.message.as_deref())
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .or_else(|| number.as_f64().filter(|f| *f > 0.0).map(|f| f as u32))
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// `null`, a bare id or a partial object all decode; anything that is not a
/// usable user object becomes the default user.
fn lenient_user<'de, D>(deserializer: D) -> Result<UserRef, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(object @ Value::Object(_)) => serde_json::from_value(object).unwrap_or_default(),
        _ => UserRef::default(),
    })
}

/// An unpopulated reference (a bare id string) or a malformed object decodes
/// as no message, which never triggers a notification.
fn lenient_last_message<'de, D>(deserializer: D) -> Result<Option<LastMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(object @ Value::Object(_)) => serde_json::from_value(object).ok(),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}
