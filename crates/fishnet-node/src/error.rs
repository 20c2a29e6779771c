//! Error types for the fishnode host.

use fishnet_transport::{RouteError, RouterError};

/// Errors that can occur while configuring or running a node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("route error: {0}")]
    Route(#[from] RouteError),
    #[error("router error: {0}")]
    Router(#[from] RouterError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
