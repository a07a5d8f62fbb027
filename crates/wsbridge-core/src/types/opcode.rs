//! WebSocket frame opcodes as seen by the bridge.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Tag distinguishing text, binary, close, ping and pong payloads.
///
/// Discriminants match the RFC 6455 opcode values the engine uses on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    /// UTF-8 text frame.
    Text = 1,
    /// Binary frame.
    Binary = 2,
    /// Close frame.
    Close = 8,
    /// Ping control frame.
    Ping = 9,
    /// Pong control frame.
    Pong = 10,
}

impl OpCode {
    /// Returns true for the binary opcode.
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Binary)
    }

    /// Opcode used by group broadcast for the host's `isBinary` flag.
    pub fn from_binary_flag(binary: bool) -> Self {
        if binary { Self::Binary } else { Self::Text }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "binary"),
            Self::Close => write!(f, "close"),
            Self::Ping => write!(f, "ping"),
            Self::Pong => write!(f, "pong"),
        }
    }
}

impl TryFrom<i64> for OpCode {
    type Error = BridgeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Text),
            2 => Ok(Self::Binary),
            8 => Ok(Self::Close),
            9 => Ok(Self::Ping),
            10 => Ok(Self::Pong),
            other => Err(BridgeError::validation(format!("unknown opcode {other}"))),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op as u8
    }
}
