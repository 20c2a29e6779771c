//! Error types for the fishnet-core crate.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Frame shorter than the fixed L3 header.
    Truncated { min: usize, actual: usize },
    /// Payload would push the frame past the MTU.
    PayloadTooLarge { max: usize, actual: usize },
    /// Output buffer too small to hold the encoded header.
    BufferTooSmall { min: usize, actual: usize },
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::Truncated { min, actual } => {
                write!(f, "truncated frame: need at least {min} bytes, got {actual}")
            }
            PacketError::PayloadTooLarge { max, actual } => {
                write!(f, "payload too large: at most {max} bytes, got {actual}")
            }
            PacketError::BufferTooSmall { min, actual } => {
                write!(f, "buffer too small: need {min} bytes, got {actual}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PacketError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddrParseError {
    /// Not four dot-separated octets.
    InvalidFormat,
    /// An octet was not a decimal number in 0..=255.
    InvalidOctet,
}

impl fmt::Display for AddrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrParseError::InvalidFormat => {
                write!(f, "invalid fishnet address: expected F-n.n.n.n")
            }
            AddrParseError::InvalidOctet => {
                write!(f, "invalid fishnet address: octet out of range")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AddrParseError {}
