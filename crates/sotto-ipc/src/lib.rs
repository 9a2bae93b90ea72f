//! Sotto IPC - the line protocol between clients and the daemon.
//!
//! One inbound line is one command; one outbound line is one reply or
//! notification. Framing is newline-delimited text, so the daemon stays
//! reachable from netcat.

pub mod client;
pub mod error;
pub mod messages;
pub mod server;
pub mod watchers;

pub use client::Client;
pub use error::{IpcError, IpcResult};
pub use messages::{ClientId, Origin, Outbound, Request};
pub use server::Server;
pub use watchers::WatcherRegistry;

/// Default daemon bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8877";
