//! proctop_agent: samples this host's process table and serves the latest
//! snapshots over HTTP; or, in push mode, forwards them to another agent.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use proctop_agent::config::parse_args;
use proctop_agent::http::router;
use proctop_agent::push::run_pusher;
use proctop_agent::sampler::{local_hostname, new_system, spawn_sampler};
use proctop_agent::state::{AppState, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let args = match parse_args(std::env::args()) {
        Ok(a) => a,
        Err(msg) if msg.starts_with("Usage:") => {
            println!("{msg}");
            return Ok(());
        }
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let hostname = local_hostname(args.hostname.as_deref());

    if let Some(target) = args.push.as_deref() {
        info!(%target, host = %hostname, "push mode");
        run_pusher(target, new_system(), hostname, args.interval()).await;
        return Ok(());
    }

    let store = Store::new();
    if !args.no_local {
        spawn_sampler(store.clone(), new_system(), hostname.clone(), args.interval());
    }

    let app = router(AppState { store });
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %listener.local_addr()?, host = %hostname, local = !args.no_local, "agent listening");
    axum::serve(listener, app).await?;
    Ok(())
}
