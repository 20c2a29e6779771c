//! In-memory [`L3Host`] for exercising the router without a link layer.
//!
//! # Usage
//!
//! ```rust
//! use fishnet_core::types::FishAddr;
//! use fishnet_transport::router::{L3Handler, L3Router};
//! use fishnet_transport::testing::RecordingHost;
//!
//! let mut host = RecordingHost::new(FishAddr::from_octets([1, 0, 0, 1]));
//! let mut router = L3Router::default();
//! router.send(&mut host, b"hi", FishAddr::BROADCAST, 2, 4).unwrap();
//! assert_eq!(host.sent.len(), 1);
//! ```

use fishnet_core::packet::fcmp::FcmpError;
use fishnet_core::packet::header::L3Header;
use fishnet_core::types::FishAddr;

use crate::forwarding::{ForwardingTable, RouteTable};
use crate::router::L3Host;

/// A payload handed to the upper layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub payload: Vec<u8>,
    pub protocol: u8,
    pub src: FishAddr,
}

/// A frame handed to the link layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSend {
    pub frame: Vec<u8>,
    pub next_hop: FishAddr,
    pub l2_proto: u8,
}

/// An FCMP report requested by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmpReport {
    pub frame: Vec<u8>,
    pub error: FcmpError,
}

/// Host that records every collaborator call.
#[derive(Debug)]
pub struct RecordingHost {
    pub address: FishAddr,
    pub routes: RouteTable,
    pub delivered: Vec<Delivery>,
    pub sent: Vec<LinkSend>,
    pub fcmp: Vec<FcmpReport>,
}

impl RecordingHost {
    pub fn new(address: FishAddr) -> Self {
        Self {
            address,
            routes: RouteTable::new(),
            delivered: Vec::new(),
            sent: Vec::new(),
            fcmp: Vec::new(),
        }
    }

    /// Forget recorded calls, keeping address and routes.
    pub fn clear(&mut self) {
        self.delivered.clear();
        self.sent.clear();
        self.fcmp.clear();
    }

    /// Drain the frames handed to the link layer.
    pub fn take_sent(&mut self) -> Vec<LinkSend> {
        std::mem::take(&mut self.sent)
    }
}

impl ForwardingTable for RecordingHost {
    fn longest_prefix_match(&self, dst: FishAddr) -> Option<FishAddr> {
        self.routes.longest_prefix_match(dst)
    }
}

impl L3Host for RecordingHost {
    fn own_address(&self) -> FishAddr {
        self.address
    }

    fn deliver(&mut self, payload: &[u8], protocol: u8, src: FishAddr) {
        self.delivered.push(Delivery {
            payload: payload.to_vec(),
            protocol,
            src,
        });
    }

    fn l2_send(&mut self, frame: &[u8], next_hop: FishAddr, l2_proto: u8) {
        self.sent.push(LinkSend {
            frame: frame.to_vec(),
            next_hop,
            l2_proto,
        });
    }

    fn send_fcmp_response(&mut self, frame: &[u8], error: FcmpError) {
        self.fcmp.push(FcmpReport {
            frame: frame.to_vec(),
            error,
        });
    }
}

/// Encode a complete L3 frame.
///
/// # Panics
///
/// If `payload` exceeds the maximum L3 payload.
pub fn build_frame(
    ttl: u8,
    protocol: u8,
    packet_id: u32,
    src: FishAddr,
    dst: FishAddr,
    payload: &[u8],
) -> Vec<u8> {
    L3Header {
        ttl,
        protocol,
        packet_id,
        src,
        dst,
    }
    .encode_frame(payload)
    .expect("payload fits in one frame")
}
