//! Fishnet L3 addressing.
//!
//! Addresses are 32-bit values written in dotted form with an `F-` prefix,
//! e.g. `F-10.0.0.1`. The first dotted octet is the most significant byte,
//! which is also the first byte on the wire.

use core::fmt;
use core::str::FromStr;

use crate::error::AddrParseError;

/// A fishnet node address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[must_use]
pub struct FishAddr(u32);

impl FishAddr {
    /// Flood address: every node that receives it delivers and re-forwards.
    pub const BROADCAST: FishAddr = FishAddr(0xFFFF_FFFF);

    /// The invalid address; never assigned to a node.
    pub const UNSPECIFIED: FishAddr = FishAddr(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn from_octets(octets: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(octets))
    }

    pub const fn octets(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }

    pub const fn is_unspecified(self) -> bool {
        self.0 == 0
    }

    /// Network mask for a prefix length; lengths above 32 saturate to /32.
    pub const fn mask(prefix_len: u8) -> u32 {
        match prefix_len {
            0 => 0,
            n if n >= 32 => u32::MAX,
            n => u32::MAX << (32 - n as u32),
        }
    }

    /// Whether this address falls inside `network/prefix_len`.
    #[must_use]
    pub const fn matches_prefix(self, network: FishAddr, prefix_len: u8) -> bool {
        let mask = Self::mask(prefix_len);
        self.0 & mask == network.0 & mask
    }
}

impl From<u32> for FishAddr {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<FishAddr> for u32 {
    fn from(addr: FishAddr) -> Self {
        addr.0
    }
}

impl fmt::Display for FishAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "F-{a}.{b}.{c}.{d}")
    }
}

impl fmt::Debug for FishAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FishAddr({self})")
    }
}

impl FromStr for FishAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let body = match s.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("f-") => &s[2..],
            _ => s,
        };

        let mut octets = [0u8; 4];
        let mut parts = body.split('.');
        for octet in &mut octets {
            let part = parts.next().ok_or(AddrParseError::InvalidFormat)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AddrParseError::InvalidFormat);
            }
            *octet = part.parse().map_err(|_| AddrParseError::InvalidOctet)?;
        }
        if parts.next().is_some() {
            return Err(AddrParseError::InvalidFormat);
        }
        Ok(Self::from_octets(octets))
    }
}
