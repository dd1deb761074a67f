//! Non-blocking accept loop (§4.G) — on each readiness fire, accept
//! connections until `WouldBlock`, rejecting once
//! `active_connections >= MAX_CLIENTS`.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::connection::{self, Shared};

pub const MAX_CLIENTS: usize = 10_000;

pub async fn accept_loop(
    listener: TcpListener,
    shared: Shared,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if !*shutdown.borrow() {
                    tracing::info!("accept loop shutting down");
                    return;
                }
            }
            readiness = listener.accept() => {
                match readiness {
                    Ok((stream, peer_addr)) => accept_one(stream, peer_addr, &shared, &shutdown),
                    Err(e) if e.kind() == ErrorKind::WouldBlock => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept() failed");
                    }
                }
            }
        }
    }
}

fn accept_one(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    shared: &Shared,
    shutdown: &tokio::sync::watch::Receiver<bool>,
) {
    let Some(handle) = shared.registry.insert(peer_addr, MAX_CLIENTS) else {
        tracing::error!(%peer_addr, "rejecting connection: at MAX_CLIENTS");
        return;
    };

    if let Err(e) = connection::tune_socket(&stream) {
        tracing::warn!(%peer_addr, error = %e, "failed to tune accepted socket");
    }

    let shared = shared.clone();
    let shutdown = shutdown.clone();
    let span = tracing::info_span!("connection", peer = %peer_addr);
    use tracing::Instrument;
    tokio::spawn(
        async move {
            connection::run(stream, peer_addr, Arc::clone(&handle), shared, shutdown).await;
        }
        .instrument(span),
    );
}
