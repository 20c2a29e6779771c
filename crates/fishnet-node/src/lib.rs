//! Host side of a fishnet node.
//!
//! This crate wires the L3 router to a UDP link stand-in, the echo
//! service, FCMP responses, and an operator console, and drives them from
//! a single-task event loop.

pub mod config;
pub mod console;
pub mod echo;
pub mod error;
pub mod fcmp;
pub mod host;
pub mod link;
pub mod logging;
pub mod node;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::{Node, ShutdownHandle};
