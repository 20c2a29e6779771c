//! Transport layer error types.

use fishnet_core::error::PacketError;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("invalid prefix length: {0}")]
    InvalidPrefixLength(u8),
}
