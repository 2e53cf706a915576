//! Network Module
//!
//! Client side of the TCP connection.
//!
//! ## Architecture
//! - `Transport` owns the stream and frames one response per command
//! - `Connection` exposes the protocol operations on top of it
//! - Guards scope temporary tube changes

mod connection;
mod scope;
mod transport;

pub use connection::Connection;
pub use scope::{TubeGuard, WatchGuard};
pub use transport::{classify, Transport};
