//! Forwarding engine for fishnet nodes.
//!
//! This crate decides, for every inbound or locally originated L3 frame,
//! whether to deliver it, flood it, forward it, drop it, or signal an FCMP
//! error. It owns the duplicate-suppression table that keeps broadcast
//! flooding loop-safe and consumes the rest of the node through the
//! [`router::L3Host`] collaborator trait.

pub mod dedup;
pub mod error;
pub mod forwarding;
pub mod router;
pub mod testing;

pub use dedup::{DedupConfig, DuplicateTable};
pub use error::{RouteError, RouterError};
pub use forwarding::{ForwardingTable, Route, RouteKey, RouteKind, RouteTable};
pub use router::{L3Handler, L3Host, L3Router, RouterConfig};
