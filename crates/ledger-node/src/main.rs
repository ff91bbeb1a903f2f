use clap::Parser;
use ledger_core::{ChainRegistry, LedgerConfig};
use ledger_node::{router, AppState};
use std::{net::SocketAddr, time::Duration};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Leading zero hex characters a proof digest must carry
    #[arg(long, default_value_t = ledger_core::constants::DEFAULT_DIFFICULTY)]
    difficulty: usize,

    /// Abort a mining request after this many seconds
    #[arg(long)]
    mine_timeout_secs: Option<u64>,

    /// Chains to create at startup (repeatable)
    #[arg(long = "chain", default_value = "main")]
    chains: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = LedgerConfig::new(
        args.difficulty,
        args.mine_timeout_secs.map(Duration::from_secs),
    )?;
    let registry = ChainRegistry::new(config);
    for name in &args.chains {
        registry.create(name)?;
    }

    let app = router(AppState::new(registry));

    let addr: SocketAddr = args.listen.parse()?;
    info!(difficulty = args.difficulty, chains = ?args.chains, "ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
