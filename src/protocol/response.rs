//! Response definitions
//!
//! Represents status lines and bodies received from the server.

use std::fmt;

use bytes::Bytes;

/// Status tokens of the beanstalk protocol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Inserted,
    Buried,
    ExpectedCrlf,
    JobTooBig,
    Draining,
    Reserved,
    DeadlineSoon,
    TimedOut,
    Deleted,
    NotFound,
    Released,
    Touched,
    Kicked,
    Found,
    Using,
    Watching,
    NotIgnored,
    Ok,
    Paused,

    // Generic server faults
    OutOfMemory,
    InternalError,
    BadFormat,
    UnknownCommand,

    /// A token outside the vocabulary this client knows
    Other(String),
}

impl Status {
    /// Parse a status token. Unknown tokens are kept as `Other`.
    pub fn parse(token: &str) -> Self {
        match token {
            "INSERTED" => Status::Inserted,
            "BURIED" => Status::Buried,
            "EXPECTED_CRLF" => Status::ExpectedCrlf,
            "JOB_TOO_BIG" => Status::JobTooBig,
            "DRAINING" => Status::Draining,
            "RESERVED" => Status::Reserved,
            "DEADLINE_SOON" => Status::DeadlineSoon,
            "TIMED_OUT" => Status::TimedOut,
            "DELETED" => Status::Deleted,
            "NOT_FOUND" => Status::NotFound,
            "RELEASED" => Status::Released,
            "TOUCHED" => Status::Touched,
            "KICKED" => Status::Kicked,
            "FOUND" => Status::Found,
            "USING" => Status::Using,
            "WATCHING" => Status::Watching,
            "NOT_IGNORED" => Status::NotIgnored,
            "OK" => Status::Ok,
            "PAUSED" => Status::Paused,
            "OUT_OF_MEMORY" => Status::OutOfMemory,
            "INTERNAL_ERROR" => Status::InternalError,
            "BAD_FORMAT" => Status::BadFormat,
            "UNKNOWN_COMMAND" => Status::UnknownCommand,
            other => Status::Other(other.to_string()),
        }
    }

    /// The wire token
    pub fn as_str(&self) -> &str {
        match self {
            Status::Inserted => "INSERTED",
            Status::Buried => "BURIED",
            Status::ExpectedCrlf => "EXPECTED_CRLF",
            Status::JobTooBig => "JOB_TOO_BIG",
            Status::Draining => "DRAINING",
            Status::Reserved => "RESERVED",
            Status::DeadlineSoon => "DEADLINE_SOON",
            Status::TimedOut => "TIMED_OUT",
            Status::Deleted => "DELETED",
            Status::NotFound => "NOT_FOUND",
            Status::Released => "RELEASED",
            Status::Touched => "TOUCHED",
            Status::Kicked => "KICKED",
            Status::Found => "FOUND",
            Status::Using => "USING",
            Status::Watching => "WATCHING",
            Status::NotIgnored => "NOT_IGNORED",
            Status::Ok => "OK",
            Status::Paused => "PAUSED",
            Status::OutOfMemory => "OUT_OF_MEMORY",
            Status::InternalError => "INTERNAL_ERROR",
            Status::BadFormat => "BAD_FORMAT",
            Status::UnknownCommand => "UNKNOWN_COMMAND",
            Status::Other(token) => token,
        }
    }

    /// Server-side faults that are never part of a command's vocabulary
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Status::OutOfMemory | Status::InternalError | Status::BadFormat | Status::UnknownCommand
        )
    }

    /// Index (within the rest of the status line) of the declared body length,
    /// for statuses that are followed by a body.
    ///
    /// ```text
    /// RESERVED <id> <bytes>\r\n<data>\r\n
    /// FOUND <id> <bytes>\r\n<data>\r\n
    /// OK <bytes>\r\n<data>\r\n
    /// ```
    pub fn length_field(&self) -> Option<usize> {
        match self {
            Status::Reserved | Status::Found => Some(1),
            Status::Ok => Some(0),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One framed server response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status token
    pub status: Status,

    /// Remainder of the status line after the first whitespace run.
    /// Equal to the status token when the line has nothing else.
    pub rest: String,

    /// Body bytes for statuses that declare a length
    pub body: Option<Bytes>,
}

impl Response {
    /// Build a response from a status line (without its CRLF)
    pub fn from_line(line: &str, body: Option<Bytes>) -> Self {
        let line = line.trim();
        let (token, rest) = match line.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim_start()),
            None => (line, line),
        };

        Self {
            status: Status::parse(token),
            rest: rest.to_string(),
            body,
        }
    }

    /// Whitespace separated fields of the rest of the line
    pub fn fields(&self) -> std::str::SplitWhitespace<'_> {
        self.rest.split_whitespace()
    }

    /// Parse the rest of the line as a single integer
    pub fn rest_as_u64(&self) -> crate::Result<u64> {
        self.rest.trim().parse().map_err(|_| {
            crate::StalkError::Protocol(format!(
                "{}: expected an integer, got '{}'",
                self.status, self.rest
            ))
        })
    }
}
