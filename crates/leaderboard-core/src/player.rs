//! Player identity and timing values

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Display identity of a player
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Transport representation (a JSON string)
    pub fn to_transport(&self) -> Value {
        Value::String(self.0.clone())
    }

    /// Host representation of an identity received from the server.
    ///
    /// Strings are taken as-is; any other JSON value becomes its compact text.
    pub fn from_transport(value: &Value) -> Self {
        match value {
            Value::String(s) => Self(s.clone()),
            other => Self(other.to_string()),
        }
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PlayerName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A player's identity paired with a time value, as carried by
/// `player_time` and `update_player`
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerTime {
    pub player: PlayerName,
    pub time: f64,
}

impl PlayerTime {
    pub fn new(player: PlayerName, time: f64) -> Self {
        Self { player, time }
    }

    /// Two-element payload `[identity, time]`
    pub fn to_payload(&self) -> Value {
        Value::Array(vec![self.player.to_transport(), time_to_json(self.time)])
    }

    /// Parse a `[identity, time]` payload
    pub fn from_payload(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            BridgeError::ProtocolError(format!("Expected [player, time] array, got {}", value))
        })?;

        match items.as_slice() {
            [player, time] => {
                let time = time.as_f64().ok_or_else(|| {
                    BridgeError::ProtocolError(format!("Time is not a number: {}", time))
                })?;
                Ok(Self {
                    player: PlayerName::from_transport(player),
                    time,
                })
            }
            _ => Err(BridgeError::ProtocolError(format!(
                "Expected 2 elements, got {}",
                items.len()
            ))),
        }
    }
}

/// Encode a time the way a JSON transport does: integral values as
/// integers, non-finite values as `null`.
pub fn time_to_json(time: f64) -> Value {
    if !time.is_finite() {
        return Value::Null;
    }
    if time.fract() == 0.0 && time.abs() < i64::MAX as f64 {
        return Value::from(time as i64);
    }
    serde_json::Number::from_f64(time)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
