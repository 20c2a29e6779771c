//! FCMP responses built by the node when the router reports a frame as
//! undeliverable.
//!
//! The payload is the 4-byte big-endian error code followed by the header of
//! the offending frame. No response is ever generated for a broadcast frame
//! or for another FCMP frame, so error reports cannot storm.

use fishnet_core::constants::{FCMP_PROTOCOL, L3_HEADER_SIZE};
use fishnet_core::packet::fcmp::FcmpError;
use fishnet_core::packet::header::L3Header;
use fishnet_core::types::FishAddr;

/// An FCMP message waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmpResponse {
    pub dst: FishAddr,
    pub payload: Vec<u8>,
}

/// Build the response for `frame`, or `None` when it must be suppressed.
pub fn build_response(frame: &[u8], error: FcmpError) -> Option<FcmpResponse> {
    let (header, _) = L3Header::decode(frame).ok()?;
    if header.dst.is_broadcast() || header.protocol == FCMP_PROTOCOL {
        return None;
    }

    let mut payload = Vec::with_capacity(4 + L3_HEADER_SIZE);
    payload.extend_from_slice(&error.code().to_be_bytes());
    payload.extend_from_slice(&frame[..L3_HEADER_SIZE]);
    Some(FcmpResponse {
        dst: header.src,
        payload,
    })
}

/// Decode a received FCMP payload into the error and the offending header.
pub fn parse_response(payload: &[u8]) -> Option<(FcmpError, L3Header)> {
    if payload.len() < 4 + L3_HEADER_SIZE {
        return None;
    }
    let code = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let error = FcmpError::from_code(code)?;
    let (header, _) = L3Header::decode(&payload[4..]).ok()?;
    Some((error, header))
}
