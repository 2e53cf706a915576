//! # stalkline
//!
//! A synchronous client for the beanstalk work-queue protocol with:
//! - Byte-exact response framing (job bodies may contain `\r\n`)
//! - Typed errors separating transport, server, and domain failures
//! - Explicit text and binary job bodies
//! - Scoped tube switching with guaranteed restore
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Connection                            │
//! │        (put / reserve / delete / peek / stats / ...)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Command + expected status sets
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Transport                             │
//! │         (send, fault interception, classification)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌────────────────┐
//!   │   Encoder   │          │ ResponseBuffer │
//!   │ (one frame) │          │ (line → body)  │
//!   └──────┬──────┘          └───────▲────────┘
//!          │                         │
//!          ▼                         │
//!   ┌─────────────────────────────────────────┐
//!   │           TcpStream (or any Read+Write)  │
//!   └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use stalkline::{Config, Connection, PutParams, Reserved};
//!
//! # fn main() -> stalkline::Result<()> {
//! let mut conn = Connection::connect(Config::default())?;
//! let id = conn.put("hey!", PutParams::default())?;
//!
//! if let Reserved::Job(mut job) = conn.reserve_with_timeout(0u64)? {
//!     assert_eq!(job.id(), id);
//!     job.delete(&mut conn)?;
//! }
//! conn.close();
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod document;
pub mod job;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use document::{Document, DocumentDecoder, RawDecoder, Scalar, YamlDecoder};
pub use error::{Result, StalkError};
pub use job::{Job, JobBody, Reserved};
pub use network::{Connection, TubeGuard, WatchGuard};
pub use protocol::{Command, PutParams, Seconds, Status};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of stalkline
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
