//! FCMP error kinds signalled back toward a frame's sender.

use core::fmt;

/// Why a frame could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FcmpError {
    /// TTL reached zero before the frame arrived.
    TtlExpired = 1,
    /// The forwarding table has no route to the destination.
    NoRoute = 2,
}

impl FcmpError {
    /// Wire code of this error kind.
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(FcmpError::TtlExpired),
            2 => Some(FcmpError::NoRoute),
            _ => None,
        }
    }
}

impl fmt::Display for FcmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FcmpError::TtlExpired => write!(f, "ttl expired"),
            FcmpError::NoRoute => write!(f, "no route"),
        }
    }
}
