//! Protocol codec
//!
//! Encoding of commands and framing of responses.
//!
//! ## Wire Format
//!
//! ### Request
//! ```text
//! keyword arg1 arg2 ... argN\r\n
//! put <pri> <delay> <ttr> <bytes>\r\n<data>\r\n
//! ```
//!
//! ### Response
//! ```text
//! STATUS [rest]\r\n
//! STATUS [id] <bytes>\r\n<data>\r\n
//! ```
//!
//! The body of a response is never scanned for delimiters: once the status
//! line has been parsed, exactly `<bytes>` octets are taken verbatim, followed
//! by a mandatory `\r\n`.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Command, Response};
use crate::config::DEFAULT_MAX_BODY_SIZE;
use crate::error::{Result, StalkError};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Longest status line accepted before giving up on finding its terminator
pub const MAX_LINE_LENGTH: usize = 4096;

/// Size of a single read from the underlying stream
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command into one frame
///
/// Format: `keyword args...\r\n`, plus `data\r\n` for commands with a body
pub fn encode_command(command: &Command) -> Bytes {
    let args = command.args();
    let body = command.body();

    let header_len = command.keyword().len() + args.iter().map(|a| a.len() + 1).sum::<usize>();
    let body_len = body.map(|b| b.len() + CRLF.len()).unwrap_or(0);

    let mut frame = BytesMut::with_capacity(header_len + CRLF.len() + body_len);
    frame.put_slice(command.keyword().as_bytes());
    for arg in &args {
        frame.put_u8(b' ');
        frame.put_slice(arg.as_bytes());
    }
    frame.put_slice(CRLF);

    if let Some(body) = body {
        frame.put_slice(body);
        frame.put_slice(CRLF);
    }

    frame.freeze()
}

/// Write a command to a stream as a single frame
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let frame = encode_command(command);
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Response Framing
// =============================================================================

/// Framing state
#[derive(Debug, Clone)]
enum State {
    /// Looking for the `\r\n` that ends the status line.
    /// `scanned` bytes of the buffer are known not to contain it.
    WaitingForLine { scanned: usize },
    /// Status line parsed, waiting for `len` body bytes plus the trailing CRLF.
    WaitingForBody { line: String, len: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete responses.
///
/// Bytes may arrive in arbitrarily small pieces. The line terminator and the
/// length digits are allowed to straddle reads; body bytes are only counted,
/// never interpreted.
#[derive(Debug)]
pub struct ResponseBuffer {
    buffer: BytesMut,
    state: State,
    max_body_size: usize,
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuffer {
    /// Create a buffer with the default body size limit
    pub fn new() -> Self {
        Self::with_max_body(DEFAULT_MAX_BODY_SIZE)
    }

    /// Create a buffer with a custom body size limit
    pub fn with_max_body(max_body_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            state: State::WaitingForLine { scanned: 0 },
            max_body_size,
        }
    }

    /// Append bytes received from the stream
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes buffered but not yet consumed by a complete response
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a response is partially decoded
    pub fn is_mid_frame(&self) -> bool {
        !self.buffer.is_empty() || matches!(self.state, State::WaitingForBody { .. })
    }

    /// Drop all buffered bytes and partial state
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLine { scanned: 0 };
    }

    /// Extract the next complete response, if enough bytes have arrived
    pub fn next_response(&mut self) -> Result<Option<Response>> {
        loop {
            match &mut self.state {
                State::WaitingForLine { scanned } => {
                    let Some(line_end) = find_crlf(&self.buffer, *scanned) else {
                        if self.buffer.len() > MAX_LINE_LENGTH {
                            return Err(StalkError::Protocol(format!(
                                "status line exceeds {} bytes without a terminator",
                                MAX_LINE_LENGTH
                            )));
                        }
                        // The last byte may be the '\r' of a split terminator.
                        *scanned = self.buffer.len().saturating_sub(1);
                        return Ok(None);
                    };

                    let raw = self.buffer.split_to(line_end);
                    self.buffer.advance(CRLF.len());

                    let line = std::str::from_utf8(&raw)
                        .map_err(|_| {
                            StalkError::Protocol("status line is not valid UTF-8".to_string())
                        })?
                        .to_string();

                    let probe = Response::from_line(&line, None);
                    match probe.status.length_field() {
                        Some(index) => {
                            let len = declared_length(&probe, index)?;
                            // `len + CRLF` must stay representable in the body state
                            if len > self.max_body_size
                                || len.checked_add(CRLF.len()).is_none()
                            {
                                return Err(StalkError::Protocol(format!(
                                    "declared body of {} bytes exceeds limit of {}",
                                    len, self.max_body_size
                                )));
                            }
                            tracing::trace!(status = %probe.status, len, "waiting for body");
                            self.state = State::WaitingForBody { line, len };
                        }
                        None => {
                            self.state = State::WaitingForLine { scanned: 0 };
                            return Ok(Some(probe));
                        }
                    }
                }
                State::WaitingForBody { line, len } => {
                    let len = *len;
                    if self.buffer.len() < len + CRLF.len() {
                        return Ok(None);
                    }

                    let body = self.buffer.split_to(len).freeze();
                    if &self.buffer[..CRLF.len()] != CRLF {
                        return Err(StalkError::Protocol(format!(
                            "body of {} bytes is not followed by CRLF",
                            len
                        )));
                    }
                    self.buffer.advance(CRLF.len());

                    let response = Response::from_line(line, Some(body));
                    self.state = State::WaitingForLine { scanned: 0 };
                    return Ok(Some(response));
                }
            }
        }
    }
}

/// Position of the first CRLF at or after `from`
fn find_crlf(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(CRLF.len())
        .position(|w| w == CRLF)
        .map(|pos| pos + from)
}

/// Read the declared body length from a status line
fn declared_length(response: &Response, index: usize) -> Result<usize> {
    let field = response.fields().nth(index).ok_or_else(|| {
        StalkError::Protocol(format!(
            "{} response is missing its length field: '{}'",
            response.status, response.rest
        ))
    })?;

    field.parse().map_err(|_| {
        StalkError::Protocol(format!(
            "{} response has an invalid length field: '{}'",
            response.status, field
        ))
    })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete response from a stream
///
/// Blocks until a full frame has arrived. Bytes past the end of the frame
/// stay in `buffer` for the next call.
pub fn read_response<R: Read>(reader: &mut R, buffer: &mut ResponseBuffer) -> Result<Response> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        if let Some(response) = buffer.next_response()? {
            return Ok(response);
        }

        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "connection closed with {} bytes of an incomplete response",
                    buffer.buffered()
                ),
            )
            .into());
        }

        tracing::trace!(bytes = n, "read from stream");
        buffer.push(&chunk[..n]);
    }
}
