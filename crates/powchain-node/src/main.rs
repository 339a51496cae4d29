use clap::Parser;
use powchain_node::{constants::DEFAULT_LISTEN, generate_node_id, router, AppState};
use std::net::SocketAddr;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "powchain-node")]
#[command(about = "HTTP node serving a single in-memory proof-of-work chain")]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, env = "POWCHAIN_LISTEN", default_value = DEFAULT_LISTEN)]
    listen: SocketAddr,

    /// Address credited with mining rewards; random when omitted
    #[arg(long, env = "POWCHAIN_NODE_ID")]
    node_id: Option<String>,

    /// Give up a proof search after this many candidates
    #[arg(long, env = "POWCHAIN_MAX_ATTEMPTS")]
    max_attempts: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let node_id = args.node_id.unwrap_or_else(generate_node_id);
    let state = AppState::new(node_id.as_str(), args.max_attempts);
    info!(%node_id, max_attempts = ?args.max_attempts, "ledger initialised with genesis block");

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("powchain-node listening on http://{}", args.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("powchain-node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
