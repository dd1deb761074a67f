//! The live-connection registry (§3, §4.G, §5) — shared by the
//! reactor (insert on accept, remove on close) and the reaper
//! (periodic traversal). A single mutex guards insertion, removal,
//! and traversal, exactly as §5 specifies; `active_connections`
//! always equals the list length (§3 invariant).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-connection bookkeeping visible to the reaper. The reactor
/// holds the matching socket and buffers; this handle only carries
/// what a maintenance sweep needs to decide whether a connection is
/// stale.
pub struct ConnectionHandle {
    pub id: u64,
    pub peer_addr: SocketAddr,
    last_activity_secs: AtomicU64,
    /// Set by the reaper when a connection is judged idle; the
    /// reactor's per-connection task observes this (via `notify`) and
    /// closes the socket from its own side — the registry never
    /// touches the socket directly.
    close_requested: AtomicBool,
    /// Wakes a parked connection task immediately when the reaper
    /// marks it for closure, instead of waiting for the task's own
    /// timers to next fire.
    pub notify: tokio::sync::Notify,
}

impl ConnectionHandle {
    fn new(id: u64, peer_addr: SocketAddr) -> Self {
        ConnectionHandle {
            id,
            peer_addr,
            last_activity_secs: AtomicU64::new(now_secs()),
            close_requested: AtomicBool::new(false),
            notify: tokio::sync::Notify::new(),
        }
    }

    pub fn touch(&self) {
        self.last_activity_secs.store(now_secs(), Ordering::Relaxed);
    }

    pub fn idle_secs(&self) -> u64 {
        now_secs().saturating_sub(self.last_activity_secs.load(Ordering::Relaxed))
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Relaxed)
    }

    pub fn request_close(&self) {
        self.close_requested.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Shared, mutex-guarded table of live connections.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<u64, Arc<ConnectionHandle>>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry {
            inner: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a newly-accepted connection, enforcing `MAX_CLIENTS`
    /// (§4.G). Returns `None` if the registry is already at capacity,
    /// in which case the caller must reject the connection.
    pub fn insert(&self, peer_addr: SocketAddr, max_clients: usize) -> Option<Arc<ConnectionHandle>> {
        let mut map = self.inner.lock().unwrap();
        if map.len() >= max_clients {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ConnectionHandle::new(id, peer_addr));
        map.insert(id, handle.clone());
        Some(handle)
    }

    pub fn remove(&self, id: u64) {
        self.inner.lock().unwrap().remove(&id);
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Snapshot of every live handle, for the reaper to walk without
    /// holding the registry lock during the (cheap but non-trivial)
    /// idle check.
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.inner.lock().unwrap().values().cloned().collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:1".parse().unwrap()
    }

    #[test]
    fn insert_then_remove_keeps_active_count_accurate() {
        let reg = ConnectionRegistry::new();
        let h1 = reg.insert(addr(), 10).unwrap();
        let h2 = reg.insert(addr(), 10).unwrap();
        assert_eq!(reg.active_count(), 2);
        reg.remove(h1.id);
        assert_eq!(reg.active_count(), 1);
        reg.remove(h2.id);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn insert_rejects_once_at_capacity() {
        let reg = ConnectionRegistry::new();
        let _a = reg.insert(addr(), 1).unwrap();
        assert!(reg.insert(addr(), 1).is_none());
    }

    #[test]
    fn touch_resets_idle_time() {
        let reg = ConnectionRegistry::new();
        let h = reg.insert(addr(), 10).unwrap();
        h.touch();
        assert_eq!(h.idle_secs(), 0);
    }

    #[test]
    fn request_close_is_observable() {
        let reg = ConnectionRegistry::new();
        let h = reg.insert(addr(), 10).unwrap();
        assert!(!h.close_requested());
        h.request_close();
        assert!(h.close_requested());
    }
}
