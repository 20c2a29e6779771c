//! Router outcome and statistics types.

use fishnet_core::packet::fcmp::FcmpError;
use fishnet_core::types::FishAddr;

/// Why a received frame was silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Broadcast already seen within the suppression window.
    Duplicate,
    /// Not enough TTL left to travel another hop.
    TtlExhausted,
}

/// Result of the forward path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Handed to the link layer.
    Transmitted { next_hop: FishAddr },
    /// Dropped and reported to the sender.
    Signalled(FcmpError),
}

/// Result of the receive pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Addressed to this node and delivered upward.
    Delivered,
    /// First sighting of a broadcast: delivered and re-forwarded.
    Flooded(ForwardOutcome),
    /// Transit frame forwarded with a decremented TTL.
    Forwarded(ForwardOutcome),
    Dropped(DropReason),
}

/// Running counters kept by the router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub frames_received: u64,
    pub frames_originated: u64,
    pub delivered: u64,
    pub flooded: u64,
    pub forwarded: u64,
    pub duplicates_dropped: u64,
    pub ttl_drops: u64,
    pub transmitted: u64,
    pub fcmp_signalled: u64,
}
