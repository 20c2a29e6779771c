//! L3 receive, send, and forward paths.
//!
//! [`decision`] holds the pure classification and next-hop logic;
//! [`dispatch::L3Router`] applies it to frames, keeps the duplicate table,
//! and drives the host collaborators declared in [`host`].

pub mod decision;
pub mod dispatch;
pub mod host;
pub mod types;

pub use decision::{DestinationClass, ForwardDecision, can_relay, classify, decide_forward};
pub use dispatch::{L3Router, RouterConfig};
pub use host::{L3Handler, L3Host};
pub use types::{DropReason, ForwardOutcome, ReceiveOutcome, RouterStats};
