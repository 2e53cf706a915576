//! Transport
//!
//! Owns the byte stream and turns one command into one response.

use std::io::{Read, Write};

use crate::error::{Result, StalkError};
use crate::protocol::{read_response, write_command, Command, Response, ResponseBuffer};

/// A byte stream plus the framing state of its incoming side
pub struct Transport<S> {
    stream: S,
    buffer: ResponseBuffer,
}

impl<S: Read + Write> Transport<S> {
    pub fn new(stream: S, max_body_size: usize) -> Self {
        Self {
            stream,
            buffer: ResponseBuffer::with_max_body(max_body_size),
        }
    }

    /// Send a command and read its response.
    ///
    /// Local validation runs first, so an invalid command never reaches the
    /// stream. Server faults are raised here, before any command-specific
    /// classification.
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        command.validate()?;

        tracing::debug!(command = command.keyword(), "sending");
        write_command(&mut self.stream, command)?;

        let response = read_response(&mut self.stream, &mut self.buffer)?;
        tracing::debug!(command = command.keyword(), status = %response.status, "received");

        if response.status.is_fault() {
            return Err(StalkError::ServerFault(response.status));
        }
        Ok(response)
    }

    /// Send a command and classify the status against its vocabulary
    pub fn send_command(&mut self, command: &Command) -> Result<Response> {
        let response = self.send(command)?;
        classify(command, response)
    }

    /// Write a command without waiting for a response (used for `quit`)
    pub fn send_only(&mut self, command: &Command) -> Result<()> {
        command.validate()?;
        write_command(&mut self.stream, command)
    }
}

/// Sort a response into ok, domain failure, or unexpected
pub fn classify(command: &Command, response: Response) -> Result<Response> {
    let expected = command.expected();

    if expected.ok.contains(&response.status) {
        Ok(response)
    } else if expected.error.contains(&response.status) {
        Err(StalkError::CommandFailed {
            command: command.keyword(),
            status: response.status,
        })
    } else {
        Err(StalkError::UnexpectedResponse {
            command: command.keyword(),
            status: response.status,
        })
    }
}
