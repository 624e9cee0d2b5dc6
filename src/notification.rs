//! Build notification structures and payload decoding

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{BadgeError, Result};

/// Envelope delivered by a Pub/Sub push subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PubSubMessage,
    pub subscription: Option<String>,
}

/// A single Pub/Sub message. `data` carries the base64-encoded build
/// notification JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct PubSubMessage {
    pub data: Option<String>,
    #[serde(rename = "messageId")]
    pub message_id: Option<String>,
    #[serde(rename = "publishTime")]
    pub publish_time: Option<DateTime<Utc>>,
}

/// Data extracted from a build-completion notification.
/// Read-only after decoding; branch and tag are mutually exclusive
/// depending on what triggered the build.
#[derive(Debug, Clone)]
pub struct BuildNotification {
    pub status: String,
    pub project_id: String,
    pub repo_name: Option<String>,
    pub branch_name: Option<String>,
    pub tag_name: Option<String>,
}

impl BuildNotification {
    /// Decodes the base64 + JSON message payload into a notification.
    ///
    /// `status` and `projectId` are required top-level string fields and
    /// `substitutions` a required object; the substitution keys themselves
    /// are optional and an absent key simply yields `None`.
    pub fn from_message(message: &PubSubMessage) -> Result<Self> {
        let data = message
            .data
            .as_deref()
            .ok_or_else(|| BadgeError::Decode("event payload is missing".to_string()))?;

        let decoded = BASE64.decode(data)?;
        let text = String::from_utf8(decoded)
            .map_err(|e| BadgeError::Decode(format!("payload is not valid UTF-8: {}", e)))?;
        let payload: serde_json::Value = serde_json::from_str(&text)?;

        let status = required_string(&payload, "status")?;
        let project_id = required_string(&payload, "projectId")?;
        let substitutions = payload
            .get("substitutions")
            .and_then(|s| s.as_object())
            .ok_or_else(|| {
                BadgeError::Decode("required field 'substitutions' is missing or not an object".to_string())
            })?;

        // BRANCH_NAME is absent when the build was triggered by a tag push,
        // TAG_NAME when triggered by a branch push.
        let repo_name = optional_string(substitutions, "REPO_NAME");
        let branch_name = optional_string(substitutions, "BRANCH_NAME");
        let tag_name = optional_string(substitutions, "TAG_NAME");

        Ok(Self {
            status,
            project_id,
            repo_name,
            branch_name,
            tag_name,
        })
    }
}

fn required_string(payload: &serde_json::Value, field: &str) -> Result<String> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            BadgeError::Decode(format!("required field '{}' is missing or not a string", field))
        })
}

fn optional_string(
    object: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<String> {
    object.get(key).and_then(|v| v.as_str()).map(str::to_string)
}
