//! Engine.IO v4 / Socket.IO v5 text codec, just enough for a polling client.
//!
//! A polling response body carries one or more Engine.IO packets separated by
//! `0x1e`. Each packet is a one-digit type followed by data. Socket.IO packets
//! ride inside Engine.IO `message` packets:
//!
//! ```text
//! <type>[<namespace>,][<ack id>][<json>]
//! ```
//!
//! Binary packets are not supported; the link server never sends them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::LinkEvent;

pub const RECORD_SEPARATOR: char = '\u{1e}';

pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("empty packet")]
    Empty,
    #[error("unknown engine.io packet type '{0}'")]
    UnknownEngineType(char),
    #[error("unknown socket.io packet type '{0}'")]
    UnknownSocketType(char),
    #[error("binary packets are not supported")]
    Binary,
    #[error("invalid handshake: {0}")]
    Handshake(#[source] serde_json::Error),
    #[error("invalid packet data: {0}")]
    Data(#[source] serde_json::Error),
    #[error("malformed {kind} packet")]
    Malformed { kind: &'static str },
}

/// Body of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(h) => {
                format!("0{}", serde_json::to_string(h).unwrap_or_default())
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(d) => format!("2{}", d),
            EnginePacket::Pong(d) => format!("3{}", d),
            EnginePacket::Message(d) => format!("4{}", d),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

pub fn decode_engine(packet: &str) -> Result<EnginePacket, PacketError> {
    let mut chars = packet.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let data = chars.as_str();
    match kind {
        '0' => serde_json::from_str(data)
            .map(EnginePacket::Open)
            .map_err(PacketError::Handshake),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(data.to_string())),
        '3' => Ok(EnginePacket::Pong(data.to_string())),
        '4' => Ok(EnginePacket::Message(data.to_string())),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        'b' => Err(PacketError::Binary),
        other => Err(PacketError::UnknownEngineType(other)),
    }
}

/// Split a polling body into packets. Empty segments are skipped.
pub fn decode_payload(body: &str) -> Result<Vec<EnginePacket>, PacketError> {
    body.split(RECORD_SEPARATOR)
        .filter(|p| !p.is_empty())
        .map(decode_engine)
        .collect()
}

pub fn encode_payload(packets: &[EnginePacket]) -> String {
    packets
        .iter()
        .map(EnginePacket::encode)
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

impl SocketPacket {
    /// Connect request for the default namespace.
    pub fn connect() -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    pub fn disconnect() -> Self {
        SocketPacket::Disconnect {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn encode(&self) -> String {
        let (kind, namespace, id, data) = match self {
            SocketPacket::Connect { namespace, data } => ('0', namespace, None, data.clone()),
            SocketPacket::Disconnect { namespace } => ('1', namespace, None, None),
            SocketPacket::Event {
                namespace,
                id,
                name,
                args,
            } => {
                let mut array = vec![Value::String(name.clone())];
                array.extend(args.iter().cloned());
                ('2', namespace, *id, Some(Value::Array(array)))
            }
            SocketPacket::Ack { namespace, id, args } => {
                ('3', namespace, Some(*id), Some(Value::Array(args.clone())))
            }
            SocketPacket::ConnectError { namespace, message } => (
                '4',
                namespace,
                None,
                Some(serde_json::json!({ "message": message })),
            ),
        };
        let mut out = String::new();
        out.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Map to a link event. `None` for packets the viewer does not care about.
    pub fn into_link_event(self) -> Option<LinkEvent> {
        match self {
            SocketPacket::Connect { .. } => Some(LinkEvent::Connected),
            SocketPacket::Disconnect { .. } => Some(LinkEvent::Disconnect),
            SocketPacket::ConnectError { .. } => Some(LinkEvent::Disconnect),
            SocketPacket::Ack { .. } => None,
            SocketPacket::Event { name, args, .. } => match name.as_str() {
                "qr" => Some(LinkEvent::Qr(text_arg(&args))),
                "ready" => Some(LinkEvent::Ready(text_arg(&args))),
                "message" => Some(LinkEvent::Message(text_arg(&args))),
                "disconnect" => Some(LinkEvent::Disconnect),
                other => {
                    tracing::debug!(event = other, "ignoring link event");
                    None
                }
            },
        }
    }
}

/// First event argument as text. Non-string values are rendered as JSON.
fn text_arg(args: &[Value]) -> String {
    match args.first() {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Decode the data of an Engine.IO `message` packet.
pub fn decode_socket(packet: &str) -> Result<SocketPacket, PacketError> {
    let mut chars = packet.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let mut rest = chars.as_str();

    if matches!(kind, '5' | '6') {
        return Err(PacketError::Binary);
    }
    if !matches!(kind, '0'..='4') {
        return Err(PacketError::UnknownSocketType(kind));
    }

    let mut namespace = DEFAULT_NAMESPACE;
    if rest.starts_with('/') {
        let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
        namespace = ns;
        rest = tail;
    }
    let namespace = namespace.to_string();

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let id = if digits > 0 {
        rest[..digits].parse::<u64>().ok()
    } else {
        None
    };
    let rest = &rest[digits..];

    let data = if rest.is_empty() {
        None
    } else {
        Some(serde_json::from_str::<Value>(rest).map_err(PacketError::Data)?)
    };

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace, data }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let Some(Value::Array(mut array)) = data else {
                return Err(PacketError::Malformed { kind: "event" });
            };
            if array.is_empty() {
                return Err(PacketError::Malformed { kind: "event" });
            }
            let Value::String(name) = array.remove(0) else {
                return Err(PacketError::Malformed { kind: "event" });
            };
            Ok(SocketPacket::Event {
                namespace,
                id,
                name,
                args: array,
            })
        }
        '3' => {
            let (Some(id), Some(Value::Array(args))) = (id, data) else {
                return Err(PacketError::Malformed { kind: "ack" });
            };
            Ok(SocketPacket::Ack { namespace, id, args })
        }
        _ => {
            let message = match data {
                Some(Value::Object(map)) => map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("connection refused")
                    .to_string(),
                Some(Value::String(s)) => s,
                _ => "connection refused".to_string(),
            };
            Ok(SocketPacket::ConnectError { namespace, message })
        }
    }
}
