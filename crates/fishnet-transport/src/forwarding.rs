//! Forwarding table: destination prefix to next-hop resolution.
//!
//! The L3 engine only ever queries the table through [`ForwardingTable`].
//! Routing protocols populate the concrete [`RouteTable`].

use std::collections::BTreeMap;
use std::fmt;

use fishnet_core::types::FishAddr;

use crate::error::RouteError;

/// Read-only next-hop resolution consumed by the forward path.
pub trait ForwardingTable {
    /// Next hop for `dst` using the most specific matching route, or `None`
    /// when no route covers it.
    fn longest_prefix_match(&self, dst: FishAddr) -> Option<FishAddr>;
}

/// Where a route was learned. The letters match fishnet's table listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Connected,
    Loopback,
    Broadcast,
    DistanceVector,
    LinkState,
    Neighbor,
    Static,
}

impl RouteKind {
    pub fn as_char(self) -> char {
        match self {
            RouteKind::Connected => 'C',
            RouteKind::Loopback => 'L',
            RouteKind::Broadcast => 'B',
            RouteKind::DistanceVector => 'D',
            RouteKind::LinkState => 'Z',
            RouteKind::Neighbor => 'N',
            RouteKind::Static => 'S',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(RouteKind::Connected),
            'L' => Some(RouteKind::Loopback),
            'B' => Some(RouteKind::Broadcast),
            'D' => Some(RouteKind::DistanceVector),
            'Z' => Some(RouteKind::LinkState),
            'N' => Some(RouteKind::Neighbor),
            'S' => Some(RouteKind::Static),
            _ => None,
        }
    }
}

/// Opaque handle returned by [`RouteTable::add`], used to update or remove
/// that exact route later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey(u64);

/// A single forwarding table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub destination: FishAddr,
    pub prefix_len: u8,
    pub next_hop: FishAddr,
    /// Lower is better.
    pub metric: u32,
    pub kind: RouteKind,
}

impl Route {
    #[must_use]
    pub fn covers(&self, addr: FishAddr) -> bool {
        addr.matches_prefix(self.destination, self.prefix_len)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} via {} metric {}",
            self.kind.as_char(),
            self.destination,
            self.prefix_len,
            self.next_hop,
            self.metric
        )
    }
}

/// Forwarding table holding every learned route.
///
/// Several routes to the same prefix may coexist; lookups prefer the longest
/// prefix, then the smallest metric, then the earliest added.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: BTreeMap<RouteKey, Route>,
    next_key: u64,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route and return its key.
    pub fn add(
        &mut self,
        destination: FishAddr,
        prefix_len: u8,
        next_hop: FishAddr,
        metric: u32,
        kind: RouteKind,
    ) -> Result<RouteKey, RouteError> {
        if prefix_len > 32 {
            return Err(RouteError::InvalidPrefixLength(prefix_len));
        }

        let key = RouteKey(self.next_key);
        self.next_key += 1;
        self.routes.insert(
            key,
            Route {
                destination,
                prefix_len,
                next_hop,
                metric,
                kind,
            },
        );
        Ok(key)
    }

    /// Remove a route, returning it if the key was live.
    pub fn remove(&mut self, key: RouteKey) -> Option<Route> {
        self.routes.remove(&key)
    }

    /// Change a route's metric. Returns `false` for an unknown key.
    pub fn update_metric(&mut self, key: RouteKey, metric: u32) -> bool {
        match self.routes.get_mut(&key) {
            Some(route) => {
                route.metric = metric;
                true
            }
            None => false,
        }
    }

    /// Best route covering `dst`.
    #[must_use]
    pub fn lookup(&self, dst: FishAddr) -> Option<&Route> {
        self.routes
            .values()
            .filter(|r| r.covers(dst))
            .min_by_key(|r| (std::cmp::Reverse(r.prefix_len), r.metric))
    }

    /// Remove every route of the given kind. Returns the number removed.
    pub fn clear_kind(&mut self, kind: RouteKind) -> usize {
        let before = self.routes.len();
        self.routes.retain(|_, r| r.kind != kind);
        before - self.routes.len()
    }

    /// Iterate over all routes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RouteKey, &Route)> {
        self.routes.iter().map(|(k, r)| (*k, r))
    }

    /// Iterate over routes of one kind.
    pub fn iter_kind(&self, kind: RouteKind) -> impl Iterator<Item = (RouteKey, &Route)> {
        self.iter().filter(move |(_, r)| r.kind == kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl ForwardingTable for RouteTable {
    fn longest_prefix_match(&self, dst: FishAddr) -> Option<FishAddr> {
        self.lookup(dst).map(|r| r.next_hop)
    }
}
