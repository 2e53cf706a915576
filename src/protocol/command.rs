//! Command definitions
//!
//! Represents every request the client can send, together with the status
//! vocabulary each one accepts.

use std::time::Duration;

use bytes::Bytes;

use super::Status;
use crate::error::{Result, StalkError};

/// Default job priority (2^31, the middle of the u32 range)
pub const DEFAULT_PRIORITY: u32 = 1 << 31;

/// Default time-to-run
pub const DEFAULT_TTR: Seconds = Seconds(120);

/// Longest tube name the server accepts, in bytes
pub const MAX_TUBE_NAME_LENGTH: usize = 200;

// =============================================================================
// Seconds
// =============================================================================

/// A whole number of seconds, as every duration on the wire is.
///
/// Converting from a `Duration` truncates sub-second precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seconds(pub u64);

impl Seconds {
    pub fn as_secs(self) -> u64 {
        self.0
    }
}

impl From<u64> for Seconds {
    fn from(secs: u64) -> Self {
        Seconds(secs)
    }
}

impl From<u32> for Seconds {
    fn from(secs: u32) -> Self {
        Seconds(secs.into())
    }
}

impl From<Duration> for Seconds {
    fn from(duration: Duration) -> Self {
        Seconds(duration.as_secs())
    }
}

/// Parameters for `put`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutParams {
    pub priority: u32,
    pub delay: Seconds,
    pub ttr: Seconds,
}

impl Default for PutParams {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            delay: Seconds(0),
            ttr: DEFAULT_TTR,
        }
    }
}

impl PutParams {
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn delay(mut self, delay: impl Into<Seconds>) -> Self {
        self.delay = delay.into();
        self
    }

    pub fn ttr(mut self, ttr: impl Into<Seconds>) -> Self {
        self.ttr = ttr.into();
        self
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Accepted and domain-error statuses of a command
#[derive(Debug, Clone, Copy)]
pub struct Expected {
    pub ok: &'static [Status],
    pub error: &'static [Status],
}

const fn expect(ok: &'static [Status], error: &'static [Status]) -> Expected {
    Expected { ok, error }
}

const NONE: &[Status] = &[];
const INSERTED: &[Status] = &[Status::Inserted];
const PUT_ERRORS: &[Status] = &[
    Status::JobTooBig,
    Status::Buried,
    Status::Draining,
    Status::ExpectedCrlf,
];
const RESERVE_OK: &[Status] = &[Status::Reserved, Status::DeadlineSoon, Status::TimedOut];
const DELETED: &[Status] = &[Status::Deleted];
const NOT_FOUND: &[Status] = &[Status::NotFound];
const RELEASED: &[Status] = &[Status::Released];
const RELEASE_ERRORS: &[Status] = &[Status::Buried, Status::NotFound];
const BURIED: &[Status] = &[Status::Buried];
const TOUCHED: &[Status] = &[Status::Touched];
const KICKED: &[Status] = &[Status::Kicked];
const PEEK_OK: &[Status] = &[Status::Found, Status::NotFound];
const USING: &[Status] = &[Status::Using];
const WATCHING: &[Status] = &[Status::Watching];
const NOT_IGNORED: &[Status] = &[Status::NotIgnored];
const OK: &[Status] = &[Status::Ok];
const PAUSED: &[Status] = &[Status::Paused];

/// A request to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Put {
        priority: u32,
        delay: Seconds,
        ttr: Seconds,
        body: Bytes,
    },
    Reserve,
    ReserveWithTimeout {
        timeout: Seconds,
    },
    Delete {
        id: u64,
    },
    Release {
        id: u64,
        priority: u32,
        delay: Seconds,
    },
    Bury {
        id: u64,
        priority: u32,
    },
    Touch {
        id: u64,
    },
    Kick {
        bound: u64,
    },
    KickJob {
        id: u64,
    },
    Peek {
        id: u64,
    },
    PeekReady,
    PeekDelayed,
    PeekBuried,
    Use {
        tube: String,
    },
    Watch {
        tube: String,
    },
    Ignore {
        tube: String,
    },
    ListTubeUsed,
    ListTubes,
    ListTubesWatched,
    Stats,
    StatsTube {
        tube: String,
    },
    StatsJob {
        id: u64,
    },
    PauseTube {
        tube: String,
        delay: Seconds,
    },
    Quit,
}

impl Command {
    /// Protocol keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Put { .. } => "put",
            Command::Reserve => "reserve",
            Command::ReserveWithTimeout { .. } => "reserve-with-timeout",
            Command::Delete { .. } => "delete",
            Command::Release { .. } => "release",
            Command::Bury { .. } => "bury",
            Command::Touch { .. } => "touch",
            Command::Kick { .. } => "kick",
            Command::KickJob { .. } => "kick-job",
            Command::Peek { .. } => "peek",
            Command::PeekReady => "peek-ready",
            Command::PeekDelayed => "peek-delayed",
            Command::PeekBuried => "peek-buried",
            Command::Use { .. } => "use",
            Command::Watch { .. } => "watch",
            Command::Ignore { .. } => "ignore",
            Command::ListTubeUsed => "list-tube-used",
            Command::ListTubes => "list-tubes",
            Command::ListTubesWatched => "list-tubes-watched",
            Command::Stats => "stats",
            Command::StatsTube { .. } => "stats-tube",
            Command::StatsJob { .. } => "stats-job",
            Command::PauseTube { .. } => "pause-tube",
            Command::Quit => "quit",
        }
    }

    /// Header-line arguments, in wire order
    pub fn args(&self) -> Vec<String> {
        match self {
            Command::Put {
                priority,
                delay,
                ttr,
                body,
            } => vec![
                priority.to_string(),
                delay.0.to_string(),
                ttr.0.to_string(),
                body.len().to_string(),
            ],
            Command::ReserveWithTimeout { timeout } => vec![timeout.0.to_string()],
            Command::Delete { id }
            | Command::Touch { id }
            | Command::KickJob { id }
            | Command::Peek { id }
            | Command::StatsJob { id } => vec![id.to_string()],
            Command::Release {
                id,
                priority,
                delay,
            } => vec![id.to_string(), priority.to_string(), delay.0.to_string()],
            Command::Bury { id, priority } => vec![id.to_string(), priority.to_string()],
            Command::Kick { bound } => vec![bound.to_string()],
            Command::Use { tube }
            | Command::Watch { tube }
            | Command::Ignore { tube }
            | Command::StatsTube { tube } => vec![tube.clone()],
            Command::PauseTube { tube, delay } => vec![tube.clone(), delay.0.to_string()],
            Command::Reserve
            | Command::PeekReady
            | Command::PeekDelayed
            | Command::PeekBuried
            | Command::ListTubeUsed
            | Command::ListTubes
            | Command::ListTubesWatched
            | Command::Stats
            | Command::Quit => Vec::new(),
        }
    }

    /// Raw body sent after the header line
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Command::Put { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Tube name argument, if the command takes one
    pub fn tube(&self) -> Option<&str> {
        match self {
            Command::Use { tube }
            | Command::Watch { tube }
            | Command::Ignore { tube }
            | Command::StatsTube { tube }
            | Command::PauseTube { tube, .. } => Some(tube),
            _ => None,
        }
    }

    /// Local checks that must pass before anything is written
    pub fn validate(&self) -> Result<()> {
        match self.tube() {
            Some(tube) => validate_tube_name(tube),
            None => Ok(()),
        }
    }

    /// Status vocabulary of this command
    pub fn expected(&self) -> Expected {
        match self {
            Command::Put { .. } => expect(INSERTED, PUT_ERRORS),
            Command::Reserve | Command::ReserveWithTimeout { .. } => expect(RESERVE_OK, NONE),
            Command::Delete { .. } => expect(DELETED, NOT_FOUND),
            Command::Release { .. } => expect(RELEASED, RELEASE_ERRORS),
            Command::Bury { .. } => expect(BURIED, NOT_FOUND),
            Command::Touch { .. } => expect(TOUCHED, NOT_FOUND),
            Command::Kick { .. } => expect(KICKED, NONE),
            Command::KickJob { .. } => expect(KICKED, NOT_FOUND),
            Command::Peek { .. }
            | Command::PeekReady
            | Command::PeekDelayed
            | Command::PeekBuried => expect(PEEK_OK, NONE),
            Command::Use { .. } | Command::ListTubeUsed => expect(USING, NONE),
            Command::Watch { .. } => expect(WATCHING, NONE),
            Command::Ignore { .. } => expect(WATCHING, NOT_IGNORED),
            Command::ListTubes | Command::ListTubesWatched | Command::Stats => expect(OK, NONE),
            Command::StatsTube { .. } | Command::StatsJob { .. } => expect(OK, NOT_FOUND),
            Command::PauseTube { .. } => expect(PAUSED, NOT_FOUND),
            Command::Quit => expect(NONE, NONE),
        }
    }
}

/// Reject tube names the server would refuse
pub fn validate_tube_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StalkError::Validation("tube name must not be empty".to_string()));
    }
    if name.len() > MAX_TUBE_NAME_LENGTH {
        return Err(StalkError::Validation(format!(
            "tube name must be at most {} bytes, got {}",
            MAX_TUBE_NAME_LENGTH,
            name.len()
        )));
    }
    if name.starts_with('-') {
        return Err(StalkError::Validation(format!(
            "tube name must not start with '-': {:?}",
            name
        )));
    }
    if let Some(bad) = name.chars().find(|c| !is_tube_name_char(*c)) {
        return Err(StalkError::Validation(format!(
            "tube name contains {:?}, allowed are letters, digits and -+/;.$_()",
            bad
        )));
    }
    Ok(())
}

fn is_tube_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-+/;.$_()".contains(c)
}
