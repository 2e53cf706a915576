//! Job handle
//!
//! A job returned by `reserve` or one of the `peek` commands. The handle only
//! holds data; lifecycle calls go back through the connection that is passed
//! in explicitly.

use std::io::{Read, Write};

use bytes::Bytes;

use crate::document::Scalar;
use crate::error::{Result, StalkError};
use crate::network::Connection;
use crate::protocol::{Response, Seconds, DEFAULT_PRIORITY};

/// Representation of a job body
pub trait JobBody: Sized {
    fn from_bytes(bytes: Bytes) -> Result<Self>;
}

impl JobBody for Bytes {
    fn from_bytes(bytes: Bytes) -> Result<Self> {
        Ok(bytes)
    }
}

impl JobBody for String {
    fn from_bytes(bytes: Bytes) -> Result<Self> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// A job known to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job<B = Bytes> {
    id: u64,
    body: B,
    size: usize,
    reserved: bool,
}

impl<B: JobBody> Job<B> {
    /// Decode a `RESERVED <id> <bytes>` or `FOUND <id> <bytes>` response.
    ///
    /// Peeked jobs start out reserved as well, so lifecycle calls on them are
    /// passed through to the server.
    pub(crate) fn from_response(response: Response) -> Result<Self> {
        let (id, size) = {
            let mut fields = response.fields();
            let id = fields
                .next()
                .and_then(|f| f.parse::<u64>().ok())
                .ok_or_else(|| {
                    StalkError::Protocol(format!(
                        "{}: missing job id in '{}'",
                        response.status, response.rest
                    ))
                })?;
            let size = fields
                .next()
                .and_then(|f| f.parse::<usize>().ok())
                .ok_or_else(|| {
                    StalkError::Protocol(format!(
                        "{}: missing job size in '{}'",
                        response.status, response.rest
                    ))
                })?;
            (id, size)
        };

        let body = response.body.unwrap_or_default();
        if body.len() != size {
            return Err(StalkError::Protocol(format!(
                "job {} declared {} bytes but carried {}",
                id,
                size,
                body.len()
            )));
        }

        Ok(Self {
            id,
            body: B::from_bytes(body)?,
            size,
            reserved: true,
        })
    }
}

impl<B> Job<B> {
    /// Server-assigned id
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn into_body(self) -> B {
        self.body
    }

    /// Declared body length in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// True while this client holds the reservation
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    /// Delete the job
    pub fn delete<S: Read + Write>(&mut self, conn: &mut Connection<S>) -> Result<()> {
        conn.delete(self.id)?;
        self.reserved = false;
        Ok(())
    }

    /// Release the job back to the ready queue.
    ///
    /// Does nothing unless reserved. Without an explicit priority the job
    /// keeps its current one.
    pub fn release<S: Read + Write>(
        &mut self,
        conn: &mut Connection<S>,
        priority: Option<u32>,
        delay: impl Into<Seconds>,
    ) -> Result<()> {
        if !self.reserved {
            return Ok(());
        }
        let priority = match priority {
            Some(p) => p,
            None => self.current_priority(conn)?,
        };
        conn.release(self.id, priority, delay)?;
        self.reserved = false;
        Ok(())
    }

    /// Bury the job. Does nothing unless reserved.
    pub fn bury<S: Read + Write>(
        &mut self,
        conn: &mut Connection<S>,
        priority: Option<u32>,
    ) -> Result<()> {
        if !self.reserved {
            return Ok(());
        }
        let priority = match priority {
            Some(p) => p,
            None => self.current_priority(conn)?,
        };
        conn.bury(self.id, priority)?;
        self.reserved = false;
        Ok(())
    }

    /// Ask for more time on a reserved job
    pub fn touch<S: Read + Write>(&self, conn: &mut Connection<S>) -> Result<()> {
        if self.reserved {
            conn.touch(self.id)?;
        }
        Ok(())
    }

    /// Move a buried or delayed job to the ready queue
    pub fn kick<S: Read + Write>(&self, conn: &mut Connection<S>) -> Result<()> {
        conn.kick_job(self.id)
    }

    pub fn stats<S: Read + Write>(
        &self,
        conn: &mut Connection<S>,
    ) -> Result<crate::document::Document> {
        conn.stats_job(self.id)
    }

    /// Priority as reported by `stats-job`, or the default when documents
    /// are not decoded
    fn current_priority<S: Read + Write>(&self, conn: &mut Connection<S>) -> Result<u32> {
        let stats = self.stats(conn)?;
        Ok(stats
            .get("pri")
            .and_then(Scalar::as_u64)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(DEFAULT_PRIORITY))
    }
}

impl Job<Bytes> {
    /// Reinterpret the body as UTF-8 text
    pub fn into_text(self) -> Result<Job<String>> {
        Ok(Job {
            id: self.id,
            body: String::from_bytes(self.body)?,
            size: self.size,
            reserved: self.reserved,
        })
    }
}

/// Outcome of a reserve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reserved<B = Bytes> {
    /// A job was reserved
    Job(Job<B>),
    /// The timeout elapsed with no job available
    TimedOut,
    /// A job already reserved by this client is about to exceed its TTR
    DeadlineSoon,
}

impl<B> Reserved<B> {
    /// `TimedOut` becomes `None`; `DeadlineSoon` becomes an error
    pub fn into_job(self) -> Result<Option<Job<B>>> {
        match self {
            Reserved::Job(job) => Ok(Some(job)),
            Reserved::TimedOut => Ok(None),
            Reserved::DeadlineSoon => Err(StalkError::DeadlineSoon),
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Reserved::TimedOut)
    }
}
