//! Black-box integration tests for `kvstored`.
//!
//! Each test spawns the compiled binary on its own loopback port and
//! drives it over a real `TcpStream`, talking the line protocol
//! directly — the same approach this workspace's own integration
//! harness takes for its daemon (spawn the real binary, skip mocking),
//! with no root or namespace setup needed since this protocol is
//! plain loopback TCP.

#![allow(clippy::zombie_processes)]

mod infra;
mod protocol;
