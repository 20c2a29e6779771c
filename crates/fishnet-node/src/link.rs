//! UDP datagrams standing in for the link layer.
//!
//! Each L3 frame travels as one datagram prefixed with the 1-byte link
//! protocol tag. Neighbors are configured statically as
//! `(fishnet address, socket address)` pairs.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use fishnet_core::constants::MTU;
use fishnet_core::types::FishAddr;

/// Size of the receive buffer: the largest frame plus the link tag.
pub const LINK_RECV_BUFFER: usize = MTU + 1;

/// A directly attached peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub address: FishAddr,
    pub socket: SocketAddr,
}

/// Prefix `frame` with the link protocol tag.
pub fn encode_datagram(l2_proto: u8, frame: &[u8]) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(frame.len() + 1);
    datagram.push(l2_proto);
    datagram.extend_from_slice(frame);
    datagram
}

/// Split a datagram into its link protocol tag and frame.
pub fn decode_datagram(datagram: &[u8]) -> Option<(u8, &[u8])> {
    datagram.split_first().map(|(tag, frame)| (*tag, frame))
}

/// A UDP socket plus the neighbors reachable through it.
#[derive(Debug)]
pub struct UdpLink {
    socket: UdpSocket,
    local_addr: SocketAddr,
    own: FishAddr,
    neighbors: Vec<Neighbor>,
    send_errors: u64,
}

impl UdpLink {
    pub async fn bind(bind: SocketAddr, own: FishAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(bind).await?;
        let local_addr = socket.local_addr()?;
        info!(%local_addr, address = %own, "udp link bound");
        Ok(Self {
            socket,
            local_addr,
            own,
            neighbors: Vec::new(),
            send_errors: 0,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn neighbors(&self) -> &[Neighbor] {
        &self.neighbors
    }

    /// Attach a neighbor, replacing any previous socket for its address.
    pub fn add_neighbor(&mut self, neighbor: Neighbor) {
        self.neighbors.retain(|n| n.address != neighbor.address);
        debug!(address = %neighbor.address, socket = %neighbor.socket, "neighbor attached");
        self.neighbors.push(neighbor);
    }

    /// Socket addresses a frame for `next_hop` is sent to.
    pub fn resolve(&self, next_hop: FishAddr) -> Vec<SocketAddr> {
        if next_hop.is_broadcast() {
            self.neighbors.iter().map(|n| n.socket).collect()
        } else if next_hop == self.own {
            vec![self.local_addr]
        } else {
            self.neighbors
                .iter()
                .filter(|n| n.address == next_hop)
                .map(|n| n.socket)
                .collect()
        }
    }

    /// Datagrams the socket refused.
    pub fn send_errors(&self) -> u64 {
        self.send_errors
    }

    /// Transmit `frame` toward `next_hop`, once per resolved socket.
    ///
    /// A target that fails is logged and counted without stopping the
    /// rest. Returns the number of datagrams sent; 0 with no error counted
    /// means no attached peer owns `next_hop`.
    pub async fn send_frame(&mut self, frame: &[u8], next_hop: FishAddr, l2_proto: u8) -> usize {
        let targets = self.resolve(next_hop);
        if targets.is_empty() {
            debug!(%next_hop, "no attached neighbor for next hop");
            return 0;
        }

        let datagram = encode_datagram(l2_proto, frame);
        let mut sent = 0;
        for target in targets {
            match self.socket.send_to(&datagram, target).await {
                Ok(_) => sent += 1,
                Err(e) => {
                    self.send_errors += 1;
                    warn!(%next_hop, %target, "link send failed: {e}");
                }
            }
        }
        sent
    }

    /// Receive one datagram.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }
}
