//! Envelope and notification payload types.
//!
//! A message arrives as a transport envelope whose `Type` tells a
//! subscription handshake apart from a delivered notification. For
//! notifications, the envelope's `Message` field is itself a JSON document
//! that decodes into a [`Notification`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NotifyError, NotifyResult};

/// Discriminator carried in the envelope `Type` field (or the
/// `x-amz-sns-message-type` header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    SubscriptionConfirmation,
    Notification,
    Other(String),
}

impl From<&str> for MessageType {
    fn from(value: &str) -> Self {
        match value {
            "SubscriptionConfirmation" => MessageType::SubscriptionConfirmation,
            "Notification" => MessageType::Notification,
            other => MessageType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::SubscriptionConfirmation => f.write_str("SubscriptionConfirmation"),
            MessageType::Notification => f.write_str("Notification"),
            MessageType::Other(other) => f.write_str(other),
        }
    }
}

/// Outer transport envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Type", default)]
    pub message_type: Option<String>,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
    #[serde(rename = "SubscribeURL", default)]
    pub subscribe_url: Option<String>,
    #[serde(rename = "MessageId", default)]
    pub message_id: Option<String>,
    #[serde(rename = "TopicArn", default)]
    pub topic_arn: Option<String>,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
}

impl Envelope {
    /// Parse an envelope from a raw message body.
    pub fn parse(body: &str) -> NotifyResult<Self> {
        serde_json::from_str(body).map_err(|e| NotifyError::parse("envelope", e))
    }

    /// The envelope's own discriminator, if any.
    pub fn kind(&self) -> Option<MessageType> {
        self.message_type.as_deref().map(MessageType::from)
    }

    /// Confirmation URL of a subscription handshake.
    pub fn subscribe_url(&self) -> NotifyResult<&str> {
        self.subscribe_url
            .as_deref()
            .ok_or_else(|| NotifyError::MissingField("SubscribeURL".to_string()))
    }

    /// Decode the inner `Message` into a notification.
    pub fn notification(&self) -> NotifyResult<Notification> {
        let message = self
            .message
            .as_deref()
            .ok_or_else(|| NotifyError::MissingField("Message".to_string()))?;
        Notification::parse(message)
    }
}

/// One object-storage event: where the object lives and what it contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub url: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Notification {
    pub fn parse(payload: &str) -> NotifyResult<Self> {
        serde_json::from_str(payload).map_err(|e| NotifyError::parse("notification", e))
    }
}

/// Descriptive metadata attached to a notification.
///
/// Values may be strings or numbers depending on the producer, so they are
/// kept as raw JSON and rendered on access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous one.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// A value rendered as text. Strings are returned without quotes;
    /// missing and null values yield `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Diagnostic name.
    pub fn name(&self) -> Option<String> {
        self.get("name")
    }

    /// Forecast period, strictly: absence and non-integer values are errors.
    pub fn forecast_period(&self) -> NotifyResult<i64> {
        let raw = self
            .0
            .get("forecast_period")
            .filter(|v| !v.is_null())
            .ok_or_else(|| NotifyError::MissingField("forecast_period".to_string()))?;

        parse_integer(raw).ok_or_else(|| NotifyError::InvalidField {
            field: "forecast_period".to_string(),
            message: format!("not an integer: {}", raw),
        })
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
