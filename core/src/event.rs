//! `Event` trait for entries appended to the booking payment event ledger.
//!
//! Ledger events are stored as JSON rather than a binary format: the ledger
//! doubles as the human-readable audit trail a support engineer reads when
//! reconstructing what happened to a booking, so `serde_json` is used in
//! place of a faster-but-opaque binary codec.

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while (de)serializing a ledger event.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize the event to JSON.
    #[error("failed to serialize event: {0}")]
    Serialization(String),

    /// Failed to deserialize the event from JSON.
    #[error("failed to deserialize event: {0}")]
    Deserialization(String),
}

/// An event that can be appended to [`crate::clock`]-timestamped ledgers.
///
/// # Event Naming Convention
///
/// `event_type()` should return a stable identifier, e.g. `"authorization_succeeded"`
/// or `"capture_failed"` — see the booking crate's event-type vocabulary for
/// the full list.
pub trait Event: Send + Sync + 'static {
    /// Returns the stable event-type identifier stored alongside the payload.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Serialization` if the event cannot be represented
    /// as JSON.
    fn to_json(&self) -> Result<serde_json::Value, EventError>
    where
        Self: Serialize,
    {
        serde_json::to_value(self).map_err(|e| EventError::Serialization(e.to_string()))
    }

    /// Deserialize an event from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Deserialization` if `value` does not match this
    /// event's shape.
    fn from_json(value: serde_json::Value) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        serde_json::from_value(value).map_err(|e| EventError::Deserialization(e.to_string()))
    }
}

/// A serialized ledger event, ready for storage.
#[derive(Clone, Debug)]
pub struct SerializedEvent {
    /// The event-type identifier (e.g. `"authorization_succeeded"`).
    pub event_type: String,

    /// The event payload as JSON.
    pub data: serde_json::Value,
}

impl SerializedEvent {
    /// Create a new serialized event from raw parts.
    #[must_use]
    pub const fn new(event_type: String, data: serde_json::Value) -> Self {
        Self { event_type, data }
    }

    /// Serialize an [`Event`] into its wire form.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Serialization` if `event` cannot be represented
    /// as JSON.
    pub fn from_event<E: Event + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_json()?,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializedEvent {{ type: {} }}", self.event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum TestEvent {
        AuthorizationSucceeded { payment_intent_id: String },
        CaptureFailed { reason: String },
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::AuthorizationSucceeded { .. } => "authorization_succeeded",
                TestEvent::CaptureFailed { .. } => "capture_failed",
            }
        }
    }

    #[test]
    fn event_type_returns_correct_identifier() {
        let event = TestEvent::AuthorizationSucceeded {
            payment_intent_id: "pi_123".to_string(),
        };
        assert_eq!(event.event_type(), "authorization_succeeded");
    }

    #[test]
    fn roundtrips_through_json() {
        let event = TestEvent::CaptureFailed {
            reason: "card_declined".to_string(),
        };

        let value = event.to_json().expect("serialization should succeed");
        let restored = TestEvent::from_json(value).expect("deserialization should succeed");

        assert_eq!(event, restored);
    }

    #[test]
    fn serialized_event_from_event_carries_type_and_payload() {
        let event = TestEvent::CaptureFailed {
            reason: "psp_timeout".to_string(),
        };

        let serialized = SerializedEvent::from_event(&event).expect("serialization should succeed");

        assert_eq!(serialized.event_type, "capture_failed");
        assert_eq!(serialized.data["reason"], "psp_timeout");
    }

    #[test]
    fn serialized_event_display_includes_type() {
        let serialized = SerializedEvent::new(
            "capture_failed".to_string(),
            serde_json::json!({"reason": "card_declined"}),
        );

        let display = format!("{serialized}");
        assert!(display.contains("capture_failed"));
    }
}
