//! Protocol constants for the fishnet L3 layer.

/// Width of the packed L3 header: ttl(1) + protocol(1) + packet_id(4) + src(4) + dst(4).
pub const L3_HEADER_SIZE: usize = 14;

// Field offsets within the L3 header.
pub const TTL_OFFSET: usize = 0;
pub const PROTOCOL_OFFSET: usize = 1;
pub const PACKET_ID_OFFSET: usize = 2;
pub const SRC_OFFSET: usize = 6;
pub const DST_OFFSET: usize = 10;

/// Largest frame a fishnet link carries.
pub const MTU: usize = 1500;

/// Largest upper-layer payload that fits behind an L3 header.
pub const MAX_L3_PAYLOAD: usize = MTU - L3_HEADER_SIZE;

/// Hop budget substituted when a sender asks for 0 or more than this.
pub const MAX_TTL: u8 = 64;

/// How long a broadcast sighting suppresses re-delivery (2 minutes).
pub const DEDUP_ENTRY_TTL_SECS: u64 = 120;

/// Bucket count of the duplicate-suppression table.
pub const DEDUP_BUCKETS: usize = 1024;

/// Link-layer protocol tag carried with every L3 frame handed to L2.
pub const L2_PROTO_L3: u8 = 1;

/// Upper-layer protocol number of the echo service.
pub const ECHO_PROTOCOL: u8 = 2;

/// Upper-layer protocol number carrying FCMP error messages.
pub const FCMP_PROTOCOL: u8 = 8;
