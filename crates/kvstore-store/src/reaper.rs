//! The idle-connection reaper (§4.K) — a small fixed pool of helper
//! OS threads, independent of the async reactor, each waking every 10
//! seconds to sweep the connection registry for connections idle
//! longer than the configured timeout (default 300s, §5). A sweep
//! only flips `close_requested` and notifies the connection's waiter;
//! the registry never touches a socket directly, so closing the
//! actual connection stays entirely the reactor's job (§4.G).
//!
//! Every worker in the pool runs an identical sweep. Sweeps are
//! idempotent and serialized by the registry's mutex, so running more
//! than one is redundant but harmless — a deliberate simplification
//! over sharding the connection list across workers, since idle-
//! connection reaping is the pool's only maintenance job (§4.K).

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::registry::ConnectionRegistry;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared shutdown signal for the helper pool: a condvar lets a
/// sleeping worker wake immediately on shutdown instead of riding out
/// its current sweep interval.
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        ShutdownSignal {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    /// Sleep for up to `dur`, waking early if shutdown is triggered.
    /// Returns `true` if shutdown was observed.
    fn sleep_or_shutdown(&self, dur: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap();
        let (guard, _timeout) = cvar.wait_timeout_while(guard, dur, |stopped| !*stopped).unwrap();
        *guard
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Sweep the registry once, requesting closure of every connection
/// idle longer than `idle_timeout`. Returns the number of connections
/// marked for closure, for logging/tests.
pub fn sweep_once(registry: &ConnectionRegistry, idle_timeout: Duration) -> usize {
    let mut reaped = 0;
    for handle in registry.snapshot() {
        if handle.idle_secs() >= idle_timeout.as_secs() {
            handle.request_close();
            reaped += 1;
        }
    }
    reaped
}

/// Spawn `worker_count` OS threads (1..64, validated by the caller —
/// §6 CLI surface), each sweeping `registry` every `sweep_interval`
/// until `shutdown` fires.
pub fn spawn_pool(
    registry: ConnectionRegistry,
    worker_count: usize,
    idle_timeout: Duration,
    sweep_interval: Duration,
    shutdown: ShutdownSignal,
) -> Vec<JoinHandle<()>> {
    (0..worker_count.max(1))
        .map(|worker_index| {
            let registry = registry.clone();
            let shutdown = shutdown.clone();
            std::thread::Builder::new()
                .name(format!("kvstore-reaper-{worker_index}"))
                .spawn(move || loop {
                    if shutdown.sleep_or_shutdown(sweep_interval) {
                        return;
                    }
                    let reaped = sweep_once(&registry, idle_timeout);
                    if reaped > 0 {
                        tracing::debug!(worker_index, reaped, "reaper swept idle connections");
                    }
                })
                .expect("failed to spawn reaper worker thread")
        })
        .collect()
}
