//! kvstore-store — the thread-safe facade over the KV engine (§4.F),
//! the live-connection registry shared between the reactor and the
//! reaper (§4.G, §5), the idle-connection reaper itself (§4.K), and
//! process-wide request/error counters.

pub mod facade;
pub mod reaper;
pub mod registry;
pub mod stats;

pub use facade::{Store, StoreError, StoreResult, TableStats};
pub use reaper::ShutdownSignal;
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use stats::Stats;
