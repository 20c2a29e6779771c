//! The node side of the router's collaborator seams.
//!
//! Callbacks from the router must not re-enter it, and the link socket is
//! only written from async context, so deliveries, transmissions, and FCMP
//! responses are queued here and drained by the node once the current
//! router call has returned.

use std::collections::VecDeque;

use tracing::debug;

use fishnet_core::packet::fcmp::FcmpError;
use fishnet_core::types::FishAddr;
use fishnet_transport::{ForwardingTable, L3Host, RouteTable};

use crate::fcmp::{self, FcmpResponse};

/// A payload delivered to this node's upper layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub payload: Vec<u8>,
    pub protocol: u8,
    pub src: FishAddr,
}

/// A frame the router handed to the link layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    pub frame: Vec<u8>,
    pub next_hop: FishAddr,
    pub l2_proto: u8,
}

/// Work produced by a router call for the node to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Delivered(Delivery),
    Transmit(Transmission),
    Fcmp(FcmpResponse),
}

#[derive(Debug)]
pub struct NodeHost {
    address: FishAddr,
    routes: RouteTable,
    events: VecDeque<HostEvent>,
}

impl NodeHost {
    pub fn new(address: FishAddr, routes: RouteTable) -> Self {
        Self {
            address,
            routes,
            events: VecDeque::new(),
        }
    }

    pub fn address(&self) -> FishAddr {
        self.address
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut RouteTable {
        &mut self.routes
    }

    pub fn next_event(&mut self) -> Option<HostEvent> {
        self.events.pop_front()
    }
}

impl ForwardingTable for NodeHost {
    fn longest_prefix_match(&self, dst: FishAddr) -> Option<FishAddr> {
        self.routes.longest_prefix_match(dst)
    }
}

impl L3Host for NodeHost {
    fn own_address(&self) -> FishAddr {
        self.address
    }

    fn deliver(&mut self, payload: &[u8], protocol: u8, src: FishAddr) {
        self.events.push_back(HostEvent::Delivered(Delivery {
            payload: payload.to_vec(),
            protocol,
            src,
        }));
    }

    fn l2_send(&mut self, frame: &[u8], next_hop: FishAddr, l2_proto: u8) {
        self.events.push_back(HostEvent::Transmit(Transmission {
            frame: frame.to_vec(),
            next_hop,
            l2_proto,
        }));
    }

    fn send_fcmp_response(&mut self, frame: &[u8], error: FcmpError) {
        match fcmp::build_response(frame, error) {
            Some(response) => self.events.push_back(HostEvent::Fcmp(response)),
            None => debug!(%error, "fcmp response suppressed"),
        }
    }
}
