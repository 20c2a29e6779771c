//! Collaborator seams between the L3 engine and the rest of the node.

use fishnet_core::packet::fcmp::FcmpError;
use fishnet_core::types::FishAddr;

use crate::error::RouterError;
use crate::forwarding::ForwardingTable;
use crate::router::types::{ForwardOutcome, ReceiveOutcome};

/// Everything the L3 engine needs from its host.
///
/// No method may retain the borrowed buffers past the call.
pub trait L3Host: ForwardingTable {
    /// This node's current address.
    fn own_address(&self) -> FishAddr;

    /// Hand a payload to the upper layer.
    fn deliver(&mut self, payload: &[u8], protocol: u8, src: FishAddr);

    /// Transmit an L3 frame toward `next_hop`. Fire and forget.
    fn l2_send(&mut self, frame: &[u8], next_hop: FishAddr, l2_proto: u8);

    /// Report `frame` as undeliverable to its sender. The host is expected to
    /// suppress responses to broadcast or FCMP frames.
    fn send_fcmp_response(&mut self, frame: &[u8], error: FcmpError);
}

/// The three L3 entry points a node registers with its event loop.
pub trait L3Handler {
    /// A frame arrived from the link layer. The caller keeps ownership.
    fn receive(
        &mut self,
        host: &mut dyn L3Host,
        frame: &[u8],
        now: u64,
    ) -> Result<ReceiveOutcome, RouterError>;

    /// Encapsulate a locally originated payload and forward it.
    fn send(
        &mut self,
        host: &mut dyn L3Host,
        payload: &[u8],
        dst: FishAddr,
        protocol: u8,
        ttl: u8,
    ) -> Result<ForwardOutcome, RouterError>;

    /// Route an already encapsulated frame.
    fn forward(
        &mut self,
        host: &mut dyn L3Host,
        frame: &[u8],
    ) -> Result<ForwardOutcome, RouterError>;
}
