//! The L3 router: receive pipeline, send path, and forward path.

use fishnet_core::constants::{L2_PROTO_L3, MAX_TTL};
use fishnet_core::packet::header::{L3Header, set_ttl};
use fishnet_core::types::FishAddr;
use tracing::{debug, trace, warn};

use crate::dedup::{DedupConfig, DuplicateTable};
use crate::error::RouterError;
use crate::router::decision::{
    DestinationClass, ForwardDecision, can_relay, classify, decide_forward,
};
use crate::router::host::{L3Handler, L3Host};
use crate::router::types::{DropReason, ForwardOutcome, ReceiveOutcome, RouterStats};

/// Router policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// TTL substituted for a requested TTL of 0 or above this value.
    pub max_ttl: u8,
    pub dedup: DedupConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_ttl: MAX_TTL,
            dedup: DedupConfig::default(),
        }
    }
}

/// L3 packet processing engine for one node.
///
/// Owns the duplicate-suppression table, so independent routers can run
/// side by side in one process.
#[derive(Debug)]
pub struct L3Router {
    dedup: DuplicateTable,
    max_ttl: u8,
    next_packet_id: u32,
    stats: RouterStats,
}

impl L3Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            dedup: DuplicateTable::new(config.dedup),
            max_ttl: config.max_ttl.max(1),
            next_packet_id: 0,
            stats: RouterStats::default(),
        }
    }

    /// Start packet ids at `id` instead of 0.
    pub fn with_initial_packet_id(mut self, id: u32) -> Self {
        self.next_packet_id = id;
        self
    }

    pub fn dedup(&self) -> &DuplicateTable {
        &self.dedup
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    pub fn max_ttl(&self) -> u8 {
        self.max_ttl
    }

    /// Replace a requested TTL of 0 or above the maximum with the maximum.
    #[must_use]
    pub fn normalize_ttl(&self, ttl: u8) -> u8 {
        if ttl == 0 || ttl > self.max_ttl {
            self.max_ttl
        } else {
            ttl
        }
    }

    /// Reclaim expired suppression entries.
    pub fn sweep(&mut self, now: u64) -> usize {
        let removed = self.dedup.sweep(now);
        if removed > 0 {
            debug!(removed, remaining = self.dedup.len(), "swept duplicate table");
        }
        removed
    }

    fn allocate_packet_id(&mut self) -> u32 {
        let id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.wrapping_add(1);
        id
    }

    /// Copy `frame` with its TTL reduced by one and forward the copy.
    fn relay(
        &mut self,
        host: &mut dyn L3Host,
        frame: &[u8],
        ttl: u8,
    ) -> Result<ForwardOutcome, RouterError> {
        let mut relayed = frame.to_vec();
        set_ttl(&mut relayed, ttl - 1)?;
        self.forward(host, &relayed)
    }
}

impl Default for L3Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl L3Handler for L3Router {
    fn receive(
        &mut self,
        host: &mut dyn L3Host,
        frame: &[u8],
        now: u64,
    ) -> Result<ReceiveOutcome, RouterError> {
        let (header, payload) = L3Header::decode(frame)?;
        self.stats.frames_received += 1;

        let own = host.own_address();
        trace!(
            src = %header.src,
            dst = %header.dst,
            ttl = header.ttl,
            packet_id = header.packet_id,
            len = frame.len(),
            "l3 frame received"
        );

        match classify(header.dst, own) {
            DestinationClass::Local => {
                host.deliver(payload, header.protocol, header.src);
                self.stats.delivered += 1;
                Ok(ReceiveOutcome::Delivered)
            }
            DestinationClass::Broadcast => {
                if self.dedup.check_and_record(header.src, header.packet_id, now) {
                    self.stats.duplicates_dropped += 1;
                    trace!(
                        src = %header.src,
                        packet_id = header.packet_id,
                        "duplicate broadcast dropped"
                    );
                    return Ok(ReceiveOutcome::Dropped(DropReason::Duplicate));
                }

                if !can_relay(header.ttl) {
                    self.stats.ttl_drops += 1;
                    debug!(src = %header.src, packet_id = header.packet_id, "broadcast out of ttl");
                    return Ok(ReceiveOutcome::Dropped(DropReason::TtlExhausted));
                }

                host.deliver(payload, header.protocol, header.src);
                self.stats.delivered += 1;
                let outcome = self.relay(host, frame, header.ttl)?;
                self.stats.flooded += 1;
                Ok(ReceiveOutcome::Flooded(outcome))
            }
            DestinationClass::Transit => {
                if !can_relay(header.ttl) {
                    self.stats.ttl_drops += 1;
                    debug!(src = %header.src, dst = %header.dst, "transit frame out of ttl");
                    return Ok(ReceiveOutcome::Dropped(DropReason::TtlExhausted));
                }

                let outcome = self.relay(host, frame, header.ttl)?;
                self.stats.forwarded += 1;
                Ok(ReceiveOutcome::Forwarded(outcome))
            }
        }
    }

    fn send(
        &mut self,
        host: &mut dyn L3Host,
        payload: &[u8],
        dst: FishAddr,
        protocol: u8,
        ttl: u8,
    ) -> Result<ForwardOutcome, RouterError> {
        let header = L3Header {
            ttl: self.normalize_ttl(ttl),
            protocol,
            packet_id: self.allocate_packet_id(),
            src: host.own_address(),
            dst,
        };
        let frame = header.encode_frame(payload)?;
        self.stats.frames_originated += 1;

        debug!(
            dst = %dst,
            protocol,
            ttl = header.ttl,
            packet_id = header.packet_id,
            len = payload.len(),
            "sending l3 frame"
        );
        self.forward(host, &frame)
    }

    fn forward(
        &mut self,
        host: &mut dyn L3Host,
        frame: &[u8],
    ) -> Result<ForwardOutcome, RouterError> {
        let (header, _) = L3Header::decode(frame)?;
        let own = host.own_address();

        match decide_forward(&header, own, &*host) {
            ForwardDecision::Transmit { next_hop } => {
                trace!(dst = %header.dst, next_hop = %next_hop, ttl = header.ttl, "forwarding");
                host.l2_send(frame, next_hop, L2_PROTO_L3);
                self.stats.transmitted += 1;
                Ok(ForwardOutcome::Transmitted { next_hop })
            }
            ForwardDecision::Signal(error) => {
                warn!(
                    src = %header.src,
                    dst = %header.dst,
                    ttl = header.ttl,
                    %error,
                    "dropping undeliverable frame"
                );
                host.send_fcmp_response(frame, error);
                self.stats.fcmp_signalled += 1;
                Ok(ForwardOutcome::Signalled(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarding::RouteKind;
    use crate::testing::{RecordingHost, build_frame};
    use fishnet_core::constants::L3_HEADER_SIZE;
    use fishnet_core::packet::fcmp::FcmpError;

    const OWN: FishAddr = FishAddr::from_octets([1, 0, 0, 1]);
    const PEER: FishAddr = FishAddr::from_octets([1, 0, 0, 2]);
    const ORIGIN: FishAddr = FishAddr::from_octets([1, 0, 0, 7]);
    const FAR: FishAddr = FishAddr::from_octets([9, 9, 9, 9]);

    fn host() -> RecordingHost {
        let mut host = RecordingHost::new(OWN);
        host.routes.add(FAR, 32, PEER, 1, RouteKind::Static).unwrap();
        host
    }

    // === Receive pipeline ===

    #[test]
    fn test_local_frame_delivered_once_never_forwarded() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(3, 2, 11, ORIGIN, OWN, b"hello");

        let outcome = router.receive(&mut host, &frame, 1000).unwrap();

        assert_eq!(outcome, ReceiveOutcome::Delivered);
        assert_eq!(host.delivered.len(), 1);
        assert_eq!(host.delivered[0].payload, b"hello");
        assert_eq!(host.delivered[0].protocol, 2);
        assert_eq!(host.delivered[0].src, ORIGIN);
        assert!(host.sent.is_empty());
        assert!(host.fcmp.is_empty());
    }

    #[test]
    fn test_local_frame_with_ttl_one_still_delivered() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(1, 2, 11, ORIGIN, OWN, b"x");
        assert_eq!(
            router.receive(&mut host, &frame, 1000).unwrap(),
            ReceiveOutcome::Delivered
        );
    }

    #[test]
    fn test_broadcast_first_sighting_delivers_and_floods() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(5, 2, 42, ORIGIN, FishAddr::BROADCAST, b"flood");

        let outcome = router.receive(&mut host, &frame, 1000).unwrap();

        assert_eq!(
            outcome,
            ReceiveOutcome::Flooded(ForwardOutcome::Transmitted {
                next_hop: FishAddr::BROADCAST
            })
        );
        assert_eq!(host.delivered.len(), 1);
        assert_eq!(host.delivered[0].payload, b"flood");
        assert_eq!(host.sent.len(), 1);
        let (sent_header, sent_payload) = L3Header::decode(&host.sent[0].frame).unwrap();
        assert_eq!(sent_header.ttl, 4);
        assert_eq!(sent_header.packet_id, 42);
        assert_eq!(sent_header.src, ORIGIN);
        assert_eq!(sent_payload, b"flood");
        assert_eq!(host.sent[0].next_hop, FishAddr::BROADCAST);
        assert_eq!(host.sent[0].l2_proto, L2_PROTO_L3);
    }

    #[test]
    fn test_caller_frame_is_not_modified() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(5, 2, 42, ORIGIN, FishAddr::BROADCAST, b"flood");
        let copy = frame.clone();
        router.receive(&mut host, &frame, 1000).unwrap();
        assert_eq!(frame, copy);
    }

    #[test]
    fn test_broadcast_duplicate_dropped() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(5, 2, 42, ORIGIN, FishAddr::BROADCAST, b"flood");

        router.receive(&mut host, &frame, 1000).unwrap();
        host.clear();

        let outcome = router.receive(&mut host, &frame, 1060).unwrap();
        assert_eq!(outcome, ReceiveOutcome::Dropped(DropReason::Duplicate));
        assert!(host.delivered.is_empty());
        assert!(host.sent.is_empty());
        assert!(host.fcmp.is_empty());
        assert_eq!(router.stats().duplicates_dropped, 1);
    }

    #[test]
    fn test_duplicate_with_different_ttl_still_dropped() {
        let mut router = L3Router::default();
        let mut host = host();
        router
            .receive(
                &mut host,
                &build_frame(5, 2, 42, ORIGIN, FishAddr::BROADCAST, b"a"),
                1000,
            )
            .unwrap();
        host.clear();

        let outcome = router
            .receive(
                &mut host,
                &build_frame(3, 2, 42, ORIGIN, FishAddr::BROADCAST, b"a"),
                1001,
            )
            .unwrap();
        assert_eq!(outcome, ReceiveOutcome::Dropped(DropReason::Duplicate));
        assert!(host.delivered.is_empty());
    }

    #[test]
    fn test_broadcast_after_window_is_fresh() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(5, 2, 42, ORIGIN, FishAddr::BROADCAST, b"flood");

        router.receive(&mut host, &frame, 1000).unwrap();
        host.clear();

        let outcome = router.receive(&mut host, &frame, 1121).unwrap();
        assert!(matches!(outcome, ReceiveOutcome::Flooded(_)));
        assert_eq!(host.delivered.len(), 1);
        assert_eq!(host.sent.len(), 1);
    }

    #[test]
    fn test_broadcast_same_id_different_source_is_distinct() {
        let mut router = L3Router::default();
        let mut host = host();
        router
            .receive(
                &mut host,
                &build_frame(5, 2, 42, ORIGIN, FishAddr::BROADCAST, b"a"),
                1000,
            )
            .unwrap();
        let outcome = router
            .receive(
                &mut host,
                &build_frame(5, 2, 42, PEER, FishAddr::BROADCAST, b"b"),
                1000,
            )
            .unwrap();
        assert!(matches!(outcome, ReceiveOutcome::Flooded(_)));
        assert_eq!(host.delivered.len(), 2);
    }

    #[test]
    fn test_broadcast_ttl_one_recorded_and_dropped() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(1, 2, 42, ORIGIN, FishAddr::BROADCAST, b"last");

        let outcome = router.receive(&mut host, &frame, 1000).unwrap();
        assert_eq!(outcome, ReceiveOutcome::Dropped(DropReason::TtlExhausted));
        assert!(host.delivered.is_empty());
        assert!(host.sent.is_empty());
        assert!(host.fcmp.is_empty());

        // The sighting was recorded: a later copy with more ttl is a duplicate.
        let again = build_frame(6, 2, 42, ORIGIN, FishAddr::BROADCAST, b"last");
        assert_eq!(
            router.receive(&mut host, &again, 1001).unwrap(),
            ReceiveOutcome::Dropped(DropReason::Duplicate)
        );
    }

    #[test]
    fn test_transit_forwarded_with_decremented_ttl() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(7, 2, 1, ORIGIN, FAR, b"via");

        let outcome = router.receive(&mut host, &frame, 1000).unwrap();

        assert_eq!(
            outcome,
            ReceiveOutcome::Forwarded(ForwardOutcome::Transmitted { next_hop: PEER })
        );
        assert!(host.delivered.is_empty());
        assert_eq!(host.sent.len(), 1);
        let (sent_header, _) = L3Header::decode(&host.sent[0].frame).unwrap();
        assert_eq!(sent_header.ttl, 6);
        assert_eq!(sent_header.dst, FAR);
    }

    #[test]
    fn test_transit_not_recorded_in_dedup() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(7, 2, 1, ORIGIN, FAR, b"via");
        router.receive(&mut host, &frame, 1000).unwrap();
        router.receive(&mut host, &frame, 1000).unwrap();
        assert_eq!(host.sent.len(), 2);
        assert!(router.dedup().is_empty());
    }

    #[test]
    fn test_transit_ttl_one_dropped_without_error() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(1, 2, 1, ORIGIN, FAR, b"via");

        let outcome = router.receive(&mut host, &frame, 1000).unwrap();
        assert_eq!(outcome, ReceiveOutcome::Dropped(DropReason::TtlExhausted));
        assert!(host.sent.is_empty());
        assert!(host.fcmp.is_empty());
        assert!(host.delivered.is_empty());
    }

    #[test]
    fn test_transit_without_route_signals_no_route() {
        let mut router = L3Router::default();
        let mut host = RecordingHost::new(OWN);
        let frame = build_frame(7, 2, 1, ORIGIN, FAR, b"via");

        let outcome = router.receive(&mut host, &frame, 1000).unwrap();
        assert_eq!(
            outcome,
            ReceiveOutcome::Forwarded(ForwardOutcome::Signalled(FcmpError::NoRoute))
        );
        assert_eq!(host.fcmp.len(), 1);
        // The reported frame is the relayed copy.
        assert_eq!(L3Header::decode(&host.fcmp[0].frame).unwrap().0.ttl, 6);
    }

    #[test]
    fn test_receive_truncated_frame() {
        let mut router = L3Router::default();
        let mut host = host();
        let result = router.receive(&mut host, &[0u8; 5], 1000);
        assert!(matches!(result, Err(RouterError::Packet(_))));
        assert!(host.delivered.is_empty());
        assert!(host.sent.is_empty());
        assert_eq!(router.stats().frames_received, 0);
    }

    // === Send path ===

    #[test]
    fn test_send_encapsulates_and_forwards() {
        let mut router = L3Router::default().with_initial_packet_id(100);
        let mut host = host();
        let payload = b"echo".to_vec();

        let outcome = router.send(&mut host, &payload, FAR, 2, 10).unwrap();

        assert_eq!(outcome, ForwardOutcome::Transmitted { next_hop: PEER });
        assert_eq!(payload, b"echo");
        assert_eq!(host.sent.len(), 1);
        let frame = &host.sent[0].frame;
        assert_eq!(frame.len(), L3_HEADER_SIZE + payload.len());
        let (header, body) = L3Header::decode(frame).unwrap();
        assert_eq!(header.ttl, 10);
        assert_eq!(header.protocol, 2);
        assert_eq!(header.packet_id, 100);
        assert_eq!(header.src, OWN);
        assert_eq!(header.dst, FAR);
        assert_eq!(body, b"echo");
    }

    #[test]
    fn test_send_ttl_normalization() {
        let router = L3Router::default();
        assert_eq!(router.normalize_ttl(0), MAX_TTL);
        assert_eq!(router.normalize_ttl(65), MAX_TTL);
        assert_eq!(router.normalize_ttl(255), MAX_TTL);
        assert_eq!(router.normalize_ttl(64), 64);
        assert_eq!(router.normalize_ttl(1), 1);

        let mut router = L3Router::new(RouterConfig {
            max_ttl: 8,
            ..RouterConfig::default()
        });
        let mut host = host();
        router.send(&mut host, b"", FAR, 2, 0).unwrap();
        router.send(&mut host, b"", FAR, 2, 9).unwrap();
        assert_eq!(L3Header::decode(&host.sent[0].frame).unwrap().0.ttl, 8);
        assert_eq!(L3Header::decode(&host.sent[1].frame).unwrap().0.ttl, 8);
    }

    #[test]
    fn test_send_assigns_distinct_packet_ids() {
        let mut router = L3Router::default().with_initial_packet_id(u32::MAX);
        let mut host = host();
        router.send(&mut host, b"a", FishAddr::BROADCAST, 2, 4).unwrap();
        router.send(&mut host, b"b", FishAddr::BROADCAST, 2, 4).unwrap();
        let first = L3Header::decode(&host.sent[0].frame).unwrap().0.packet_id;
        let second = L3Header::decode(&host.sent[1].frame).unwrap().0.packet_id;
        assert_eq!(first, u32::MAX);
        assert_eq!(second, 0);
    }

    #[test]
    fn test_send_broadcast_floods() {
        let mut router = L3Router::default();
        let mut host = RecordingHost::new(OWN);
        let outcome = router
            .send(&mut host, b"hi", FishAddr::BROADCAST, 2, 3)
            .unwrap();
        assert_eq!(
            outcome,
            ForwardOutcome::Transmitted {
                next_hop: FishAddr::BROADCAST
            }
        );
    }

    #[test]
    fn test_send_oversized_payload_rejected() {
        let mut router = L3Router::default();
        let mut host = host();
        let payload = vec![0u8; fishnet_core::constants::MAX_L3_PAYLOAD + 1];
        let result = router.send(&mut host, &payload, FAR, 2, 4);
        assert!(matches!(result, Err(RouterError::Packet(_))));
        assert!(host.sent.is_empty());
    }

    #[test]
    fn test_send_no_route_signals() {
        let mut router = L3Router::default();
        let mut host = RecordingHost::new(OWN);
        let outcome = router.send(&mut host, b"x", FAR, 2, 4).unwrap();
        assert_eq!(outcome, ForwardOutcome::Signalled(FcmpError::NoRoute));
        assert_eq!(host.fcmp.len(), 1);
    }

    // === Forward path ===

    #[test]
    fn test_forward_ttl_zero_signals_expired() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(0, 2, 1, ORIGIN, FAR, b"late");

        let outcome = router.forward(&mut host, &frame).unwrap();

        assert_eq!(outcome, ForwardOutcome::Signalled(FcmpError::TtlExpired));
        assert_eq!(host.fcmp.len(), 1);
        assert_eq!(host.fcmp[0].error, FcmpError::TtlExpired);
        assert_eq!(host.fcmp[0].frame, frame);
        assert!(host.sent.is_empty());
    }

    #[test]
    fn test_forward_no_route_signals_once() {
        let mut router = L3Router::default();
        let mut host = RecordingHost::new(OWN);
        let frame = build_frame(4, 2, 1, ORIGIN, FAR, b"lost");

        let outcome = router.forward(&mut host, &frame).unwrap();

        assert_eq!(outcome, ForwardOutcome::Signalled(FcmpError::NoRoute));
        assert_eq!(host.fcmp.len(), 1);
        assert_eq!(host.fcmp[0].error, FcmpError::NoRoute);
        assert!(host.sent.is_empty());
    }

    #[test]
    fn test_forward_to_self_loops_back() {
        let mut router = L3Router::default();
        let mut host = RecordingHost::new(OWN);
        let frame = build_frame(0, 2, 1, ORIGIN, OWN, b"me");
        let outcome = router.forward(&mut host, &frame).unwrap();
        assert_eq!(outcome, ForwardOutcome::Transmitted { next_hop: OWN });
        assert!(host.fcmp.is_empty());
    }

    #[test]
    fn test_forward_does_not_reencapsulate() {
        let mut router = L3Router::default();
        let mut host = host();
        let frame = build_frame(4, 9, 77, ORIGIN, FAR, b"as-is");
        router.forward(&mut host, &frame).unwrap();
        assert_eq!(host.sent[0].frame, frame);
    }

    #[test]
    fn test_forward_truncated_frame() {
        let mut router = L3Router::default();
        let mut host = host();
        assert!(router.forward(&mut host, &[1, 2, 3]).is_err());
        assert!(host.sent.is_empty());
        assert!(host.fcmp.is_empty());
    }

    // === Stats and maintenance ===

    #[test]
    fn test_stats_track_outcomes() {
        let mut router = L3Router::default();
        let mut host = host();
        let bcast = build_frame(5, 2, 1, ORIGIN, FishAddr::BROADCAST, b"");
        router.receive(&mut host, &bcast, 1000).unwrap();
        router.receive(&mut host, &bcast, 1000).unwrap();
        router
            .receive(&mut host, &build_frame(5, 2, 2, ORIGIN, OWN, b""), 1000)
            .unwrap();
        router
            .receive(&mut host, &build_frame(1, 2, 3, ORIGIN, FAR, b""), 1000)
            .unwrap();

        let stats = router.stats();
        assert_eq!(stats.frames_received, 4);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.flooded, 1);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(stats.ttl_drops, 1);
        assert_eq!(stats.transmitted, 1);
    }

    #[test]
    fn test_sweep_delegates_to_table() {
        let mut router = L3Router::default();
        let mut host = host();
        router
            .receive(
                &mut host,
                &build_frame(5, 2, 1, ORIGIN, FishAddr::BROADCAST, b""),
                1000,
            )
            .unwrap();
        assert_eq!(router.dedup().len(), 1);
        assert_eq!(router.sweep(1100), 0);
        assert_eq!(router.sweep(1200), 1);
        assert!(router.dedup().is_empty());
    }

    #[test]
    fn test_independent_routers_have_independent_tables() {
        let mut a = L3Router::default();
        let mut b = L3Router::default();
        let mut host = host();
        let frame = build_frame(5, 2, 1, ORIGIN, FishAddr::BROADCAST, b"");
        assert!(matches!(
            a.receive(&mut host, &frame, 1000).unwrap(),
            ReceiveOutcome::Flooded(_)
        ));
        assert!(matches!(
            b.receive(&mut host, &frame, 1000).unwrap(),
            ReceiveOutcome::Flooded(_)
        ));
    }
}
