//! L3 header wire format.
//!
//! Every L3 frame starts with a packed 14-byte header followed directly by
//! the upper-layer payload:
//!
//! ```text
//! offset  0: ttl        u8
//! offset  1: protocol   u8
//! offset  2: packet_id  u32 big-endian
//! offset  6: src        u32 big-endian
//! offset 10: dst        u32 big-endian
//! offset 14: payload...
//! ```

use alloc::vec::Vec;

use crate::constants::{
    DST_OFFSET, L3_HEADER_SIZE, MAX_L3_PAYLOAD, PACKET_ID_OFFSET, PROTOCOL_OFFSET, SRC_OFFSET,
    TTL_OFFSET,
};
use crate::error::PacketError;
use crate::types::FishAddr;

/// A decoded L3 header. Values are ephemeral: re-derive them from the frame
/// buffer rather than caching them across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct L3Header {
    pub ttl: u8,
    pub protocol: u8,
    pub packet_id: u32,
    pub src: FishAddr,
    pub dst: FishAddr,
}

fn read_u32(frame: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&frame[offset..offset + 4]);
    u32::from_be_bytes(bytes)
}

fn check_len(frame: &[u8]) -> Result<(), PacketError> {
    if frame.len() < L3_HEADER_SIZE {
        return Err(PacketError::Truncated {
            min: L3_HEADER_SIZE,
            actual: frame.len(),
        });
    }
    Ok(())
}

impl L3Header {
    /// Decode the header at the front of `frame`, returning it together with
    /// the payload that follows.
    pub fn decode(frame: &[u8]) -> Result<(Self, &[u8]), PacketError> {
        check_len(frame)?;

        let header = L3Header {
            ttl: frame[TTL_OFFSET],
            protocol: frame[PROTOCOL_OFFSET],
            packet_id: read_u32(frame, PACKET_ID_OFFSET),
            src: FishAddr::new(read_u32(frame, SRC_OFFSET)),
            dst: FishAddr::new(read_u32(frame, DST_OFFSET)),
        };
        Ok((header, &frame[L3_HEADER_SIZE..]))
    }

    /// Write the header into the first 14 bytes of `buf`.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<(), PacketError> {
        if buf.len() < L3_HEADER_SIZE {
            return Err(PacketError::BufferTooSmall {
                min: L3_HEADER_SIZE,
                actual: buf.len(),
            });
        }
        buf[TTL_OFFSET] = self.ttl;
        buf[PROTOCOL_OFFSET] = self.protocol;
        buf[PACKET_ID_OFFSET..SRC_OFFSET].copy_from_slice(&self.packet_id.to_be_bytes());
        buf[SRC_OFFSET..DST_OFFSET].copy_from_slice(&self.src.octets());
        buf[DST_OFFSET..L3_HEADER_SIZE].copy_from_slice(&self.dst.octets());
        Ok(())
    }

    /// Build a new, independently owned frame: header followed by `payload`.
    ///
    /// The result is exactly `L3_HEADER_SIZE + payload.len()` bytes.
    pub fn encode_frame(&self, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
        if payload.len() > MAX_L3_PAYLOAD {
            return Err(PacketError::PayloadTooLarge {
                max: MAX_L3_PAYLOAD,
                actual: payload.len(),
            });
        }

        let mut frame = Vec::with_capacity(L3_HEADER_SIZE + payload.len());
        frame.resize(L3_HEADER_SIZE, 0);
        self.encode_into(&mut frame)?;
        frame.extend_from_slice(payload);
        Ok(frame)
    }
}

/// Read the TTL byte of an encoded frame.
pub fn read_ttl(frame: &[u8]) -> Result<u8, PacketError> {
    check_len(frame)?;
    Ok(frame[TTL_OFFSET])
}

/// Overwrite the TTL byte of an encoded frame in place.
pub fn set_ttl(frame: &mut [u8], ttl: u8) -> Result<(), PacketError> {
    check_len(frame)?;
    frame[TTL_OFFSET] = ttl;
    Ok(())
}
