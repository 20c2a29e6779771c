use std::path::PathBuf;

use clap::Parser;

use fishnet_node::{Node, NodeConfig};

#[derive(Parser)]
#[command(name = "fishnode", about = "fishnet overlay network node")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fishnode.toml")]
    config: PathBuf,

    /// Do not print a console prompt
    #[arg(long)]
    noprompt: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    // Initialize logging
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        fishnet_node::logging::init_json(&config.logging.level);
    } else {
        fishnet_node::logging::init(&config.logging.level);
    }

    let mut node = match Node::bind(config).await {
        Ok(node) => node,
        Err(e) => {
            tracing::error!("failed to start node: {e}");
            std::process::exit(1);
        }
    };
    let handle = node.shutdown_handle();

    // Spawn signal handler
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received SIGINT, shutting down");
        handle.shutdown();
    });

    node.run(!cli.noprompt).await;
    node.shutdown();

    // The stdin reader blocks in a thread that cannot be cancelled; exit
    // instead of waiting for it on runtime teardown.
    std::process::exit(0);
}
