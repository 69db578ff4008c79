//! Wire protocol for Rust <-> leaderboard server communication
//!
//! Two layers of text packets, both carried in WebSocket text frames:
//! - Engine.IO v4: a single type digit followed by an optional payload
//! - Socket.IO v5: carried inside Engine.IO `message` packets,
//!   `<type>[/<nsp>,][<ack id>][<json>]`
//!
//! Events are Socket.IO `event` packets whose data is `["<name>", <payload>]`.

use leaderboard_core::{BridgeError, PlayerName, PlayerTime, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_PLAYER_NAME: &str = "player_name";
pub const EVENT_PLAYER_TIME: &str = "player_time";
pub const EVENT_UPDATE_PLAYER: &str = "update_player";

pub const DEFAULT_NAMESPACE: &str = "/";

/// Handshake data the server sends in the Engine.IO `open` packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPacket {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// Engine.IO v4 packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenPacket),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            EnginePacket::Open(open) => format!("0{}", serde_json::to_string(open)?),
            EnginePacket::Close => "1".into(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".into(),
            EnginePacket::Noop => "6".into(),
        })
    }

    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| BridgeError::ProtocolError("Empty Engine.IO packet".into()))?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(rest)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(rest.to_string())),
            '3' => Ok(EnginePacket::Pong(rest.to_string())),
            '4' => Ok(EnginePacket::Message(rest.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(BridgeError::ProtocolError(format!(
                "Unknown Engine.IO packet type: {:?}",
                other
            ))),
        }
    }
}

/// Socket.IO v5 packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl SocketPacketKind {
    fn digit(self) -> char {
        match self {
            SocketPacketKind::Connect => '0',
            SocketPacketKind::Disconnect => '1',
            SocketPacketKind::Event => '2',
            SocketPacketKind::Ack => '3',
            SocketPacketKind::ConnectError => '4',
            SocketPacketKind::BinaryEvent => '5',
            SocketPacketKind::BinaryAck => '6',
        }
    }

    fn from_digit(c: char) -> Result<Self> {
        match c {
            '0' => Ok(SocketPacketKind::Connect),
            '1' => Ok(SocketPacketKind::Disconnect),
            '2' => Ok(SocketPacketKind::Event),
            '3' => Ok(SocketPacketKind::Ack),
            '4' => Ok(SocketPacketKind::ConnectError),
            '5' => Ok(SocketPacketKind::BinaryEvent),
            '6' => Ok(SocketPacketKind::BinaryAck),
            other => Err(BridgeError::ProtocolError(format!(
                "Unknown Socket.IO packet type: {:?}",
                other
            ))),
        }
    }
}

/// Socket.IO v5 packet
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    pub namespace: String,
    pub ack_id: Option<u64>,
    pub data: Option<Value>,
}

impl SocketPacket {
    /// Connect request for a namespace
    pub fn connect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Connect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    pub fn disconnect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Disconnect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// Event `[name, payload]`
    pub fn event(namespace: &str, name: &str, payload: Value) -> Self {
        Self {
            kind: SocketPacketKind::Event,
            namespace: namespace.to_string(),
            ack_id: None,
            data: Some(Value::Array(vec![Value::String(name.to_string()), payload])),
        }
    }

    /// Event name and arguments, for event packets
    pub fn event_parts(&self) -> Option<(&str, &[Value])> {
        if self.kind != SocketPacketKind::Event {
            return None;
        }
        let items = self.data.as_ref()?.as_array()?;
        let (name, args) = items.split_first()?;
        Some((name.as_str()?, args))
    }

    /// Encode as the payload of an Engine.IO message
    pub fn encode(&self) -> Result<String> {
        let mut out = String::new();
        out.push(self.kind.digit());
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&serde_json::to_string(data)?);
        }
        Ok(out)
    }

    pub fn decode(payload: &str) -> Result<Self> {
        let mut chars = payload.chars();
        let kind = chars
            .next()
            .ok_or_else(|| BridgeError::ProtocolError("Empty Socket.IO packet".into()))
            .and_then(SocketPacketKind::from_digit)?;

        if matches!(
            kind,
            SocketPacketKind::BinaryEvent | SocketPacketKind::BinaryAck
        ) {
            return Err(BridgeError::ProtocolError(
                "Binary Socket.IO packets are not supported".into(),
            ));
        }

        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(end) => {
                    let nsp = &rest[..end];
                    rest = &rest[end + 1..];
                    nsp.to_string()
                }
                None => {
                    let nsp = rest.to_string();
                    rest = "";
                    nsp
                }
            }
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse()
                .map_err(|e| BridgeError::ProtocolError(format!("Bad ack id: {}", e)))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }
}

/// Events sent from the game to the server
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Announce the local player's identity
    PlayerName(PlayerName),
    /// Report a time for a player
    PlayerTime(PlayerTime),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::PlayerName(_) => EVENT_PLAYER_NAME,
            OutboundEvent::PlayerTime(_) => EVENT_PLAYER_TIME,
        }
    }

    pub fn to_packet(&self, namespace: &str) -> SocketPacket {
        let payload = match self {
            OutboundEvent::PlayerName(name) => name.to_transport(),
            OutboundEvent::PlayerTime(pt) => pt.to_payload(),
        };
        SocketPacket::event(namespace, self.name(), payload)
    }
}

/// Events pushed from the server to the game
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    UpdatePlayer(PlayerTime),
}

impl InboundEvent {
    /// Decode a Socket.IO packet.
    ///
    /// Returns `Ok(None)` for packets that are not events this bridge handles.
    pub fn decode(packet: &SocketPacket) -> Result<Option<Self>> {
        let Some((name, args)) = packet.event_parts() else {
            return Ok(None);
        };

        match name {
            EVENT_UPDATE_PLAYER => {
                let payload = args.first().ok_or_else(|| {
                    BridgeError::ProtocolError("update_player without payload".into())
                })?;
                Ok(Some(InboundEvent::UpdatePlayer(PlayerTime::from_payload(
                    payload,
                )?)))
            }
            _ => Ok(None),
        }
    }
}

/// Encode an outbound event as a complete frame
pub fn serialize(event: &OutboundEvent, namespace: &str) -> Result<String> {
    EnginePacket::Message(event.to_packet(namespace).encode()?).encode()
}

/// Decode a complete frame into an inbound event, if it carries one
pub fn deserialize(frame: &str) -> Result<Option<InboundEvent>> {
    match EnginePacket::decode(frame)? {
        EnginePacket::Message(payload) => InboundEvent::decode(&SocketPacket::decode(&payload)?),
        _ => Ok(None),
    }
}
