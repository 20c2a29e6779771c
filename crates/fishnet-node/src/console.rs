//! Operator console: one command per stdin line.

use std::fmt::Write;

use fishnet_core::types::FishAddr;
use fishnet_transport::router::RouterStats;
use fishnet_transport::{DuplicateTable, RouteTable};

use crate::link::Neighbor;

pub const HELP: &str = "\
commands:
  show route            list the forwarding table
  show neighbors        attached peers and their sockets
  show dedup            duplicate-suppression table summary
  show stats            router counters
  echo <addr> <text>    send an echo request to F-n.n.n.n
  help | ?              this text
  quit | exit           stop the node";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ShowRoute,
    ShowNeighbors,
    ShowDedup,
    ShowStats,
    Echo { dst: FishAddr, text: String },
    Help,
    Quit,
    Empty,
}

/// Parse one console line. The error is a message for the operator.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(Command::Empty);
    };

    match first.to_ascii_lowercase().as_str() {
        "show" => match words.next().map(str::to_ascii_lowercase).as_deref() {
            Some("route") | Some("routes") => Ok(Command::ShowRoute),
            Some("neighbors") | Some("neighbours") => Ok(Command::ShowNeighbors),
            Some("dedup") => Ok(Command::ShowDedup),
            Some("stats") => Ok(Command::ShowStats),
            Some(other) => Err(format!("unknown table '{other}'; type 'help' for a list")),
            None => Err("usage: show route | neighbors | dedup | stats".to_string()),
        },
        "echo" => {
            let Some(addr) = words.next() else {
                return Err("usage: echo <addr> <text>".to_string());
            };
            let dst = addr
                .parse::<FishAddr>()
                .map_err(|_| format!("{addr} is not a fishnet address; expected F-n.n.n.n"))?;
            let rest = line[first.len()..].trim_start();
            let text = rest[addr.len()..].trim().to_string();
            Ok(Command::Echo { dst, text })
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}'; type 'help' for a list")),
    }
}

/// Forwarding table listing, one route per line.
pub fn render_routes(routes: &RouteTable) -> String {
    let mut out = format!("{:<4} {:<22} {:<18} {}", "Type", "Destination", "Next hop", "Metric");
    for (_, route) in routes.iter() {
        let destination = format!("{}/{}", route.destination, route.prefix_len);
        let _ = write!(
            out,
            "\n{:<4} {:<22} {:<18} {}",
            route.kind.as_char(),
            destination,
            route.next_hop.to_string(),
            route.metric
        );
    }
    out
}

pub fn render_neighbors(neighbors: &[Neighbor]) -> String {
    if neighbors.is_empty() {
        return "no neighbors attached".to_string();
    }
    let mut out = format!("{:<18} {}", "Address", "Socket");
    for neighbor in neighbors {
        let _ = write!(out, "\n{:<18} {}", neighbor.address.to_string(), neighbor.socket);
    }
    out
}

pub fn render_dedup(table: &DuplicateTable) -> String {
    format!(
        "duplicate table: {} entries in {} buckets, longest chain {}, entry ttl {}s",
        table.len(),
        table.bucket_count(),
        table.longest_chain(),
        table.entry_ttl()
    )
}

pub fn render_stats(stats: &RouterStats) -> String {
    [
        ("frames received", stats.frames_received),
        ("frames originated", stats.frames_originated),
        ("delivered", stats.delivered),
        ("flooded", stats.flooded),
        ("forwarded", stats.forwarded),
        ("duplicates dropped", stats.duplicates_dropped),
        ("ttl drops", stats.ttl_drops),
        ("transmitted", stats.transmitted),
        ("fcmp signalled", stats.fcmp_signalled),
    ]
    .iter()
    .map(|(name, value)| format!("{name:<20} {value}"))
    .collect::<Vec<_>>()
    .join("\n")
}
