//! Echo service: the upper-layer protocol answered by every node.
//!
//! An echo message is a 4-byte big-endian code followed by free-form text.

use fishnet_core::constants::MAX_L3_PAYLOAD;

pub const ECHO_REQUEST: u32 = 1;
pub const ECHO_RESPONSE: u32 = 2;

const CODE_LEN: usize = 4;

/// Largest text that fits in one echo message.
pub const MAX_ECHO_TEXT: usize = MAX_L3_PAYLOAD - CODE_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoMessage<'a> {
    Request(&'a [u8]),
    Response(&'a [u8]),
}

impl<'a> EchoMessage<'a> {
    /// Parse an echo payload. Unknown codes and short payloads yield `None`.
    pub fn parse(payload: &'a [u8]) -> Option<Self> {
        if payload.len() < CODE_LEN {
            return None;
        }
        let (code, body) = payload.split_at(CODE_LEN);
        let code = u32::from_be_bytes([code[0], code[1], code[2], code[3]]);
        match code {
            ECHO_REQUEST => Some(EchoMessage::Request(body)),
            ECHO_RESPONSE => Some(EchoMessage::Response(body)),
            _ => None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let (code, body) = match self {
            EchoMessage::Request(body) => (ECHO_REQUEST, body),
            EchoMessage::Response(body) => (ECHO_RESPONSE, body),
        };
        let mut payload = Vec::with_capacity(CODE_LEN + body.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(body);
        payload
    }
}

/// The response payload for a request, or `None` for anything else.
pub fn respond(payload: &[u8]) -> Option<Vec<u8>> {
    match EchoMessage::parse(payload)? {
        EchoMessage::Request(body) => Some(EchoMessage::Response(body).encode()),
        EchoMessage::Response(_) => None,
    }
}
