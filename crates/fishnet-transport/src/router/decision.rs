//! Pure, synchronous routing decisions.
//!
//! Nothing here touches the duplicate table or a host; the router feeds in
//! the header and applies the result.

use fishnet_core::packet::fcmp::FcmpError;
use fishnet_core::packet::header::L3Header;
use fishnet_core::types::FishAddr;

use crate::forwarding::ForwardingTable;

/// How a received frame relates to this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationClass {
    Local,
    Broadcast,
    Transit,
}

/// What the forward path should do with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardDecision {
    Transmit { next_hop: FishAddr },
    Signal(FcmpError),
}

/// Classify by destination. The local address takes precedence.
#[must_use]
pub fn classify(dst: FishAddr, own: FishAddr) -> DestinationClass {
    if dst == own {
        DestinationClass::Local
    } else if dst.is_broadcast() {
        DestinationClass::Broadcast
    } else {
        DestinationClass::Transit
    }
}

/// A received frame may travel on only if a full hop of TTL remains after
/// the decrement.
#[must_use]
pub fn can_relay(ttl: u8) -> bool {
    ttl > 1
}

/// Resolve the next hop for an encapsulated frame.
pub fn decide_forward<T>(header: &L3Header, own: FishAddr, table: &T) -> ForwardDecision
where
    T: ForwardingTable + ?Sized,
{
    if header.ttl == 0 && header.dst != own {
        return ForwardDecision::Signal(FcmpError::TtlExpired);
    }

    let next_hop = if header.dst.is_broadcast() {
        Some(FishAddr::BROADCAST)
    } else if header.dst == own {
        Some(own)
    } else {
        table.longest_prefix_match(header.dst)
    };

    match next_hop {
        Some(next_hop) => ForwardDecision::Transmit { next_hop },
        None => ForwardDecision::Signal(FcmpError::NoRoute),
    }
}
