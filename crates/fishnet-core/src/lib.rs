//! Core types, constants, and wire formats for fishnet nodes.
//!
//! This crate defines the fishnet address type, the fixed 14-byte L3 header
//! and its codec, and the FCMP error kinds shared by the forwarding engine
//! and the node.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod error;
pub mod packet;
pub mod types;

pub use error::{AddrParseError, PacketError};
pub use packet::fcmp::FcmpError;
pub use packet::header::L3Header;
pub use types::FishAddr;
