//! Protocol Module
//!
//! Defines the beanstalk wire protocol as seen from the client.
//!
//! ## Protocol Format (text lines, length-prefixed bodies)
//!
//! ### Request Format
//! ```text
//! ┌─────────┬───┬──────────────────────┬──────┬──────────────────┐
//! │ keyword │ SP│ args (SP separated)  │ CRLF │ [data CRLF]      │
//! └─────────┴───┴──────────────────────┴──────┴──────────────────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌─────────┬───┬──────────────────────┬──────┬──────────────────┐
//! │ STATUS  │ SP│ [id] [bytes]         │ CRLF │ [data CRLF]      │
//! └─────────┴───┴──────────────────────┴──────┴──────────────────┘
//! ```
//!
//! ### Bodies
//! - `put`: request body, length given by the last header argument
//! - `RESERVED <id> <bytes>` / `FOUND <id> <bytes>`: job body
//! - `OK <bytes>`: YAML document (stats and list commands)
//!
//! ### Server Faults
//! `OUT_OF_MEMORY`, `INTERNAL_ERROR`, `BAD_FORMAT` and `UNKNOWN_COMMAND` may
//! answer any command.

mod codec;
mod command;
mod response;

pub use codec::{
    encode_command, read_response, write_command, ResponseBuffer, CRLF, MAX_LINE_LENGTH,
    READ_CHUNK_SIZE,
};
pub use command::{
    validate_tube_name, Command, Expected, PutParams, Seconds, DEFAULT_PRIORITY, DEFAULT_TTR,
    MAX_TUBE_NAME_LENGTH,
};
pub use response::{Response, Status};
