//! Engine.IO v4 / Socket.IO v5 packet codec.
//!
//! Only the text framing used over a WebSocket transport is covered.
//! Every WebSocket text frame carries one Engine.IO packet: a single
//! digit type followed by its payload. Engine.IO `message` packets in
//! turn carry one Socket.IO packet of the form
//! `<type>[<attachments>-][<namespace>,][<ack id>][<json data>]`.

use serde::Deserialize;
use serde_json::Value;

/// Errors produced while decoding a packet.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("Empty packet")]
    Empty,

    #[error("Unknown packet type '{0}'")]
    UnknownType(char),

    #[error("Malformed packet: {0}")]
    Malformed(String),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Engine.IO
// ---------------------------------------------------------------------------

/// Payload of the Engine.IO `open` packet sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenData {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// A transport-level packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenData),
    Close,
    Ping(String),
    Pong(String),
    /// Carries one Socket.IO packet.
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Encode into the text frame sent over the WebSocket.
    pub fn encode(&self) -> String {
        match self {
            // Clients never send `open`; encode the type alone.
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(data) => format!("4{data}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

/// Decode one Engine.IO packet from a WebSocket text frame.
pub fn parse_engine_packet(text: &str) -> Result<EnginePacket, PacketError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let rest = chars.as_str();

    let packet = match kind {
        '0' => EnginePacket::Open(serde_json::from_str(rest)?),
        '1' => EnginePacket::Close,
        '2' => EnginePacket::Ping(rest.to_string()),
        '3' => EnginePacket::Pong(rest.to_string()),
        '4' => EnginePacket::Message(rest.to_string()),
        '5' => EnginePacket::Upgrade,
        '6' => EnginePacket::Noop,
        other => return Err(PacketError::UnknownType(other)),
    };
    Ok(packet)
}

// ---------------------------------------------------------------------------
// Socket.IO
// ---------------------------------------------------------------------------

/// Socket.IO packet type.
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
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '0' => Self::Connect,
            '1' => Self::Disconnect,
            '2' => Self::Event,
            '3' => Self::Ack,
            '4' => Self::ConnectError,
            '5' => Self::BinaryEvent,
            '6' => Self::BinaryAck,
            _ => return None,
        })
    }

    fn as_char(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }

    fn is_binary(self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

/// A namespace-level packet.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    /// Namespace path; `/` when the packet omits it.
    pub namespace: String,
    /// Acknowledgement id requested by the sender.
    pub id: Option<u64>,
    /// Number of binary attachments that follow (binary packets only).
    pub attachments: usize,
    pub data: Option<Value>,
}

impl SocketPacket {
    /// The `CONNECT` packet that joins `namespace`.
    pub fn connect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Connect,
            namespace: namespace.to_string(),
            id: None,
            attachments: 0,
            data: None,
        }
    }

    /// The `DISCONNECT` packet that leaves `namespace`.
    pub fn disconnect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Disconnect,
            ..Self::connect(namespace)
        }
    }

    /// Event name and arguments of an `EVENT` packet.
    ///
    /// Returns `None` for other packet kinds, or when the data is not an
    /// array headed by a string.
    pub fn event(&self) -> Option<(&str, &[Value])> {
        if self.kind != SocketPacketKind::Event {
            return None;
        }
        let items = self.data.as_ref()?.as_array()?;
        let (name, args) = items.split_first()?;
        Some((name.as_str()?, args))
    }

    /// Human-readable message of a `CONNECT_ERROR` packet.
    pub fn error_message(&self) -> Option<String> {
        if self.kind != SocketPacketKind::ConnectError {
            return None;
        }
        match self.data.as_ref()? {
            Value::String(msg) => Some(msg.clone()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }

    /// Encode as the payload of an Engine.IO `message` packet.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());
        if self.kind.is_binary() {
            out.push_str(&self.attachments.to_string());
            out.push('-');
        }
        if self.namespace != "/" {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }
}

/// Decode a Socket.IO packet from an Engine.IO `message` payload.
pub fn parse_socket_packet(text: &str) -> Result<SocketPacket, PacketError> {
    let mut chars = text.chars();
    let first = chars.next().ok_or(PacketError::Empty)?;
    let kind = SocketPacketKind::from_char(first).ok_or(PacketError::UnknownType(first))?;
    let mut rest = chars.as_str();

    let mut attachments = 0;
    if kind.is_binary() {
        let (count, tail) = rest
            .split_once('-')
            .ok_or_else(|| PacketError::Malformed("missing attachment count".into()))?;
        attachments = count
            .parse()
            .map_err(|_| PacketError::Malformed(format!("bad attachment count '{count}'")))?;
        rest = tail;
    }

    let namespace = if rest.starts_with('/') {
        let (nsp, tail) = rest.split_once(',').unwrap_or((rest, ""));
        rest = tail;
        nsp.to_string()
    } else {
        "/".to_string()
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let id = if digits > 0 {
        let (raw, tail) = rest.split_at(digits);
        rest = tail;
        Some(
            raw.parse()
                .map_err(|_| PacketError::Malformed(format!("bad ack id '{raw}'")))?,
        )
    } else {
        None
    };

    let data = if rest.is_empty() {
        None
    } else {
        Some(serde_json::from_str(rest)?)
    };

    Ok(SocketPacket {
        kind,
        namespace,
        id,
        attachments,
        data,
    })
}
