//! Core Node struct and async event loop.
//!
//! One task owns the router and the host. Datagram arrivals, console lines,
//! and the sweep timer are taken one at a time and each is processed to
//! completion before the next is selected.

use std::io::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use fishnet_core::constants::{ECHO_PROTOCOL, FCMP_PROTOCOL, L2_PROTO_L3};
use fishnet_core::types::FishAddr;
use fishnet_transport::router::{ForwardOutcome, RouterStats};
use fishnet_transport::{L3Handler, L3Router, RouteKind, RouteTable};

use crate::config::{NodeConfig, parse_fish_addr, parse_socket_addr};
use crate::console::{self, Command};
use crate::echo::{self, EchoMessage, MAX_ECHO_TEXT};
use crate::error::NodeError;
use crate::fcmp;
use crate::host::{Delivery, HostEvent, NodeHost, Transmission};
use crate::link::{self, LINK_RECV_BUFFER, Neighbor, UdpLink};

/// Cloneable handle that stops a running node.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// A fishnet node: L3 router, UDP link, echo service, and console.
pub struct Node {
    router: L3Router,
    host: NodeHost,
    link: UdpLink,
    sweep_interval_secs: u64,
    started: Instant,
    notices: Vec<String>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Node {
    /// Build the node from configuration and bind its link socket.
    ///
    /// The forwarding table starts with the broadcast and loopback routes,
    /// one neighbor route per configured neighbor, and the static routes.
    pub async fn bind(config: NodeConfig) -> Result<Self, NodeError> {
        let address = config.node.address()?;
        let router_config = config.router_config()?;
        let bind_addr = parse_socket_addr(&config.link.bind)?;

        let mut routes = RouteTable::new();
        routes.add(FishAddr::BROADCAST, 32, FishAddr::BROADCAST, 0, RouteKind::Broadcast)?;
        routes.add(address, 32, address, 0, RouteKind::Loopback)?;

        let link = UdpLink::bind(bind_addr, address).await?;
        let router = L3Router::new(router_config).with_initial_packet_id(rand::random());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut node = Self {
            router,
            host: NodeHost::new(address, routes),
            link,
            sweep_interval_secs: config.dedup.sweep_interval_secs,
            started: Instant::now(),
            notices: Vec::new(),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        };

        for entry in &config.link.neighbors {
            let neighbor = parse_fish_addr(&entry.address)?;
            let socket = parse_socket_addr(&entry.socket)?;
            node.add_neighbor(neighbor, socket)?;
        }

        for entry in &config.routes {
            let destination = parse_fish_addr(&entry.destination)?;
            let next_hop = parse_fish_addr(&entry.next_hop)?;
            node.host.routes_mut().add(
                destination,
                entry.prefix_len,
                next_hop,
                entry.metric,
                RouteKind::Static,
            )?;
        }

        info!(
            %address,
            local_addr = %node.local_addr(),
            routes = node.host.routes().len(),
            "node ready"
        );
        Ok(node)
    }

    /// Attach a directly reachable neighbor and install its /32 route.
    pub fn add_neighbor(
        &mut self,
        address: FishAddr,
        socket: SocketAddr,
    ) -> Result<(), NodeError> {
        self.link.add_neighbor(Neighbor { address, socket });
        let existing: Vec<_> = self
            .host
            .routes()
            .iter_kind(RouteKind::Neighbor)
            .filter(|(_, r)| r.destination == address)
            .map(|(key, _)| key)
            .collect();
        for key in existing {
            self.host.routes_mut().remove(key);
        }
        self.host
            .routes_mut()
            .add(address, 32, address, 1, RouteKind::Neighbor)?;
        Ok(())
    }

    pub fn address(&self) -> FishAddr {
        self.host.address()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.link.local_addr()
    }

    pub fn routes(&self) -> &RouteTable {
        self.host.routes()
    }

    pub fn neighbors(&self) -> &[Neighbor] {
        self.link.neighbors()
    }

    pub fn stats(&self) -> &RouterStats {
        self.router.stats()
    }

    pub fn router(&self) -> &L3Router {
        &self.router
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Seconds since the node started; the clock for duplicate suppression.
    fn now(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Console output produced since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Originate a payload with the configured maximum TTL.
    pub async fn send(
        &mut self,
        payload: &[u8],
        dst: FishAddr,
        protocol: u8,
    ) -> Result<ForwardOutcome, NodeError> {
        let outcome = self.router.send(&mut self.host, payload, dst, protocol, 0)?;
        self.drain_host_events().await;
        Ok(outcome)
    }

    /// Process one datagram from the link.
    pub async fn handle_datagram(&mut self, datagram: &[u8], from: SocketAddr) {
        let Some((l2_proto, frame)) = link::decode_datagram(datagram) else {
            return;
        };
        if l2_proto != L2_PROTO_L3 {
            debug!(%from, l2_proto, "ignoring non-l3 datagram");
            return;
        }

        let now = self.now();
        match self.router.receive(&mut self.host, frame, now) {
            Ok(outcome) => trace!(%from, ?outcome, "frame processed"),
            Err(e) => debug!(%from, "dropping malformed frame: {e}"),
        }
        self.drain_host_events().await;
    }

    /// Wait for one datagram and process it.
    pub async fn poll_link(&mut self) -> Result<(), NodeError> {
        let mut buf = vec![0u8; LINK_RECV_BUFFER];
        let (len, from) = self.link.recv(&mut buf).await?;
        self.handle_datagram(&buf[..len], from).await;
        Ok(())
    }

    /// Reclaim expired duplicate-suppression entries.
    pub fn sweep(&mut self) -> usize {
        let now = self.now();
        self.router.sweep(now)
    }

    /// Run one console command. Returns `true` when the operator asked to quit.
    pub async fn handle_command(&mut self, line: &str) -> bool {
        let command = match console::parse(line) {
            Ok(command) => command,
            Err(hint) => {
                self.notices.push(hint);
                return false;
            }
        };

        match command {
            Command::ShowRoute => self.notices.push(console::render_routes(self.host.routes())),
            Command::ShowNeighbors => {
                self.notices.push(console::render_neighbors(self.link.neighbors()))
            }
            Command::ShowDedup => self.notices.push(console::render_dedup(self.router.dedup())),
            Command::ShowStats => self.notices.push(console::render_stats(self.router.stats())),
            Command::Echo { dst, text } => self.send_echo(dst, &text).await,
            Command::Help => self.notices.push(console::HELP.to_string()),
            Command::Quit => return true,
            Command::Empty => {}
        }
        false
    }

    async fn send_echo(&mut self, dst: FishAddr, text: &str) {
        if text.len() > MAX_ECHO_TEXT {
            self.notices
                .push(format!("echo text too long: at most {MAX_ECHO_TEXT} bytes"));
            return;
        }

        let payload = EchoMessage::Request(text.as_bytes()).encode();
        let notice = match self.send(&payload, dst, ECHO_PROTOCOL).await {
            Ok(ForwardOutcome::Transmitted { next_hop }) => {
                format!("echo request sent to {dst} via {next_hop}")
            }
            Ok(ForwardOutcome::Signalled(error)) => format!("echo to {dst} failed: {error}"),
            Err(e) => format!("echo to {dst} failed: {e}"),
        };
        self.notices.push(notice);
    }

    /// Act on everything the router queued on the host. Replies may queue
    /// further events, so this loops until the host is idle.
    async fn drain_host_events(&mut self) {
        while let Some(event) = self.host.next_event() {
            match event {
                HostEvent::Delivered(delivery) => self.handle_delivery(delivery),
                HostEvent::Transmit(Transmission {
                    frame,
                    next_hop,
                    l2_proto,
                }) => {
                    self.link.send_frame(&frame, next_hop, l2_proto).await;
                }
                HostEvent::Fcmp(response) => {
                    if let Err(e) = self.router.send(
                        &mut self.host,
                        &response.payload,
                        response.dst,
                        FCMP_PROTOCOL,
                        0,
                    ) {
                        warn!(dst = %response.dst, "failed to send fcmp response: {e}");
                    }
                }
            }
        }
    }

    fn handle_delivery(&mut self, delivery: Delivery) {
        let Delivery {
            payload,
            protocol,
            src,
        } = delivery;

        match protocol {
            ECHO_PROTOCOL => {
                if let Some(reply) = echo::respond(&payload) {
                    info!(%src, len = payload.len(), "answering echo request");
                    let sent = self.router.send(&mut self.host, &reply, src, ECHO_PROTOCOL, 0);
                    if let Err(e) = sent {
                        warn!(%src, "failed to send echo response: {e}");
                    }
                } else if let Some(EchoMessage::Response(body)) = EchoMessage::parse(&payload) {
                    let text = String::from_utf8_lossy(body);
                    info!(%src, len = body.len(), "echo response received");
                    self.notices.push(format!("echo reply from {src}: {text}"));
                } else {
                    debug!(%src, len = payload.len(), "malformed echo payload");
                }
            }
            FCMP_PROTOCOL => match fcmp::parse_response(&payload) {
                Some((error, header)) => {
                    warn!(%src, %error, dst = %header.dst, "fcmp received");
                    self.notices
                        .push(format!("fcmp from {src}: {error} (frame to {})", header.dst));
                }
                None => debug!(%src, "malformed fcmp payload"),
            },
            other => info!(%src, protocol = other, len = payload.len(), "payload delivered"),
        }
    }

    fn flush_notices(&mut self) {
        let notices = self.take_notices();
        if notices.is_empty() {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        for notice in notices {
            let _ = writeln!(stdout, "{notice}");
        }
        let _ = stdout.flush();
    }

    fn print_prompt(&self) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{}> ", self.address());
        let _ = stdout.flush();
    }

    /// Run the event loop with stdin as the console.
    pub async fn run(&mut self, prompt: bool) {
        self.run_with_console(BufReader::new(tokio::io::stdin()), prompt)
            .await;
    }

    /// Run the event loop reading commands from `console`. Returns on
    /// shutdown or a console `quit`; end of console input leaves the node
    /// running.
    pub async fn run_with_console<R>(&mut self, console: R, prompt: bool)
    where
        R: AsyncBufRead + Unpin,
    {
        let mut console_lines = console.lines();
        let mut console_open = true;

        let sweep_enabled = self.sweep_interval_secs > 0;
        let mut sweep_interval = tokio::time::interval(Duration::from_secs(if sweep_enabled {
            self.sweep_interval_secs
        } else {
            3600
        }));
        // Don't fire immediately
        sweep_interval.tick().await;

        let mut buf = vec![0u8; LINK_RECV_BUFFER];

        info!("entering event loop");
        if prompt {
            self.print_prompt();
        }

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    info!("shutdown signal received");
                    break;
                }

                received = self.link.recv(&mut buf) => {
                    match received {
                        Ok((len, from)) => self.handle_datagram(&buf[..len], from).await,
                        Err(e) => warn!("link receive failed: {e}"),
                    }
                    self.flush_notices();
                }

                line = console_lines.next_line(), if console_open => {
                    match line {
                        Ok(Some(line)) => {
                            let quit = self.handle_command(&line).await;
                            self.flush_notices();
                            if quit {
                                info!("quit requested from console");
                                break;
                            }
                            if prompt {
                                self.print_prompt();
                            }
                        }
                        Ok(None) => {
                            debug!("console input closed");
                            console_open = false;
                        }
                        Err(e) => {
                            warn!("console read failed: {e}");
                            console_open = false;
                        }
                    }
                }

                _ = sweep_interval.tick(), if sweep_enabled => {
                    self.sweep();
                }
            }
        }
    }

    /// Log final counters.
    pub fn shutdown(self) {
        let stats = self.router.stats();
        info!(
            received = stats.frames_received,
            originated = stats.frames_originated,
            delivered = stats.delivered,
            duplicates = stats.duplicates_dropped,
            link_errors = self.link.send_errors(),
            "node shutdown complete"
        );
    }
}
