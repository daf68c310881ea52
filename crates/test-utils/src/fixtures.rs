//! Common envelope fixtures for notification tests.
//!
//! Envelopes are built with `serde_json` so the inner `Message` is always
//! correctly escaped.

use serde_json::{json, Value};

/// Diagnostic names as published by the upstream topic.
pub mod diagnostics {
    pub const SURFACE_TEMPERATURE: &str = "surface_temperature";
    pub const SURFACE_AIR_PRESSURE: &str = "surface_air_pressure";
    pub const RELATIVE_HUMIDITY: &str = "relative_humidity";
}

/// Notification payload JSON for an object URL and metadata.
pub fn notification_json(url: &str, metadata: Value) -> String {
    json!({ "url": url, "metadata": metadata }).to_string()
}

/// A `Notification` envelope wrapping the given payload.
pub fn notification_envelope(url: &str, metadata: Value) -> String {
    json!({
        "Type": "Notification",
        "MessageId": "5f1a2b3c-0000-0000-0000-000000000001",
        "TopicArn": "arn:aws:sns:eu-west-2:000000000000:objects",
        "Message": notification_json(url, metadata),
        "Timestamp": "2017-06-01T00:00:00.000Z",
    })
    .to_string()
}

/// A `Notification` envelope for a diagnostic at a forecast period.
pub fn diagnostic_envelope(url: &str, name: &str, forecast_period: i64) -> String {
    notification_envelope(
        url,
        json!({
            "name": name,
            "forecast_period": forecast_period.to_string(),
            "forecast_reference_time": "2017-06-01T00:00:00Z",
        }),
    )
}

/// A `SubscriptionConfirmation` envelope.
pub fn confirmation_envelope(subscribe_url: &str) -> String {
    json!({
        "Type": "SubscriptionConfirmation",
        "MessageId": "5f1a2b3c-0000-0000-0000-000000000002",
        "TopicArn": "arn:aws:sns:eu-west-2:000000000000:objects",
        "Message": "You have chosen to subscribe to the topic.",
        "SubscribeURL": subscribe_url,
        "Timestamp": "2017-06-01T00:00:00.000Z",
    })
    .to_string()
}
