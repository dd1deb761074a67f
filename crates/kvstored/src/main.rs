//! kvstored — the typed key/value store daemon.

mod commands;
mod config;
mod connection;
mod daemonize;
mod dispatch;
mod error;
mod listener;
mod parser;
mod reply;
mod timefmt;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use kvstore_store::{reaper, ConnectionRegistry, Stats, Store};
use socket2::{Domain, Socket, Type};
use tokio::net::TcpListener;

use config::{ParseOutcome, ServerConfig};
use connection::Shared;

fn main() -> Result<()> {
    let cfg = match config::parse(std::env::args().skip(1)) {
        Ok(ParseOutcome::Run(cfg)) => cfg,
        Ok(ParseOutcome::Help) => {
            print!("{}", config::USAGE);
            return Ok(());
        }
        Ok(ParseOutcome::Version) => {
            println!("kvstored {}", commands::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("kvstored: {e}");
            eprint!("{}", config::USAGE);
            std::process::exit(1);
        }
    };

    if cfg.daemonize {
        daemonize::daemonize().context("failed to daemonize")?;
    }

    init_tracing(&cfg);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the Tokio runtime")?;

    runtime.block_on(async_main(cfg))
}

fn init_tracing(cfg: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match &cfg.log_file {
        Some(path) => {
            if let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
                tracing_subscriber::fmt().with_env_filter(filter).with_writer(file).init();
                return;
            }
        }
        None => {}
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn async_main(cfg: ServerConfig) -> Result<()> {
    let store = Store::with_capacity(cfg.capacity.unwrap_or(16));
    if let Err(e) = store.load(&cfg.db_file) {
        tracing::warn!(error = %e, path = %cfg.db_file.display(), "failed to load snapshot at startup");
    }

    let stats = Arc::new(Stats::new());
    let registry = ConnectionRegistry::new();
    let shared = Shared {
        store: store.clone(),
        stats: stats.clone(),
        registry: registry.clone(),
        db_file: cfg.db_file.clone(),
    };

    let addr = SocketAddr::new(cfg.bind, cfg.port);
    let listener = bind_listener(addr, cfg.backlog).context("failed to bind listener")?;
    tracing::info!(%addr, "kvstored listening");

    let reaper_shutdown = reaper::ShutdownSignal::new();
    let reaper_threads = reaper::spawn_pool(
        registry.clone(),
        cfg.workers,
        reaper::DEFAULT_IDLE_TIMEOUT,
        reaper::DEFAULT_SWEEP_INTERVAL,
        reaper_shutdown.clone(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(true);

    let accept_task = tokio::spawn(listener::accept_loop(listener, shared, shutdown_rx));

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining connections");
    let _ = shutdown_tx.send(false);
    reaper_shutdown.trigger();

    let _ = tokio::time::timeout(Duration::from_secs(5), accept_task).await;

    for t in reaper_threads {
        let _ = t.join();
    }

    if cfg.auto_save {
        if let Err(e) = store.auto_save(&cfg.db_file) {
            tracing::error!(error = %e, "auto-save on shutdown failed");
        }
    }

    tracing::info!("kvstored shut down cleanly");
    Ok(())
}

fn bind_listener(addr: SocketAddr, backlog: u32) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;
    TcpListener::from_std(socket.into())
}

/// Two-signal shutdown discipline (§5): the first SIGINT/SIGTERM is
/// graceful; a second forces an immediate exit rather than waiting
/// out the drain.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }

        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            tracing::warn!("second shutdown signal received, exiting immediately");
            std::process::exit(0);
        });
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
