//! Connection
//!
//! A client connection to one beanstalkd server and every protocol operation
//! on it.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::Bytes;

use super::scope::{TubeGuard, WatchGuard};
use super::transport::Transport;
use crate::config::Config;
use crate::document::{decoder_for, Document, DocumentDecoder, YamlDecoder};
use crate::error::{Result, StalkError};
use crate::job::{Job, JobBody, Reserved};
use crate::protocol::{Command, PutParams, Response, Seconds, Status};

/// A connection to a beanstalkd server.
///
/// Commands are strictly request/response: every operation takes `&mut self`
/// and returns only after its response frame has been consumed.
pub struct Connection<S: Read + Write = TcpStream> {
    config: Config,

    /// `None` once closed
    transport: Option<Transport<S>>,

    /// Turns stats/list bodies into documents
    decoder: Box<dyn DocumentDecoder>,
}

impl Connection<TcpStream> {
    /// Connect to the configured server.
    ///
    /// Fails if the socket cannot be established within the connect timeout.
    pub fn connect(config: Config) -> Result<Self> {
        let stream = open_stream(&config)?;
        tracing::info!("Connected to {}", config.addr());
        Ok(Self::from_stream(stream, config))
    }

    /// Close the current socket and open a fresh one to the same server
    pub fn reconnect(&mut self) -> Result<()> {
        self.close();
        let stream = open_stream(&self.config)?;
        self.transport = Some(Transport::new(stream, self.config.max_body_size));
        tracing::info!("Reconnected to {}", self.config.addr());
        Ok(())
    }
}

/// Resolve the configured address and connect to the first reachable socket
fn open_stream(config: &Config) -> Result<TcpStream> {
    let mut last_error = None;

    for addr in (config.host.as_str(), config.port).to_socket_addrs()? {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };

        match attempt {
            Ok(stream) => {
                // Disable Nagle's algorithm for low latency
                stream.set_nodelay(true)?;
                stream.set_read_timeout(config.read_timeout)?;
                stream.set_write_timeout(config.write_timeout)?;
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} did not resolve to any address", config.addr()),
            )
        })
        .into())
}

impl<S: Read + Write> Connection<S> {
    /// Wrap an already established stream
    pub fn from_stream(stream: S, config: Config) -> Self {
        let decoder = decoder_for(config.decode_documents);
        Self {
            transport: Some(Transport::new(stream, config.max_body_size)),
            config,
            decoder,
        }
    }

    /// Replace the document decoder
    pub fn with_decoder(mut self, decoder: impl DocumentDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Send `quit` (best effort) and release the socket
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.send_only(&Command::Quit) {
                tracing::debug!("quit to {} failed: {}", self.config.addr(), e);
            }
            tracing::info!("Closed connection to {}", self.config.addr());
        }
    }

    // -------------------------------------------------------------------------
    // Low-level
    // -------------------------------------------------------------------------

    /// Send a command and return whatever status it produced
    /// (server faults excepted)
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        let result = self.transport()?.send(command);
        self.settle(result)
    }

    /// Send a command and classify its status against the command's vocabulary
    pub fn send_command(&mut self, command: &Command) -> Result<Response> {
        let result = self.transport()?.send_command(command);
        self.settle(result)
    }

    /// Drop the stream when an exchange failed halfway, so a late frame is
    /// never read as the answer to the next command
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.breaks_stream() && self.transport.take().is_some() {
                tracing::warn!("Dropping connection to {}: {}", self.config.addr(), e);
            }
        }
        result
    }

    fn transport(&mut self) -> Result<&mut Transport<S>> {
        self.transport.as_mut().ok_or_else(|| {
            StalkError::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is closed",
            ))
        })
    }

    fn document(&mut self, command: Command) -> Result<Document> {
        let response = self.send_command(&command)?;
        let text = String::from_utf8(response.body.unwrap_or_default().to_vec())?;
        self.decoder.decode(&text)
    }

    // -------------------------------------------------------------------------
    // Producer commands
    // -------------------------------------------------------------------------

    /// Put a text job into the used tube. Returns the job id.
    pub fn put(&mut self, body: &str, params: PutParams) -> Result<u64> {
        self.put_bytes(Bytes::copy_from_slice(body.as_bytes()), params)
    }

    /// Put a binary job into the used tube. Returns the job id.
    pub fn put_bytes(&mut self, body: impl Into<Bytes>, params: PutParams) -> Result<u64> {
        let response = self.send_command(&Command::Put {
            priority: params.priority,
            delay: params.delay,
            ttr: params.ttr,
            body: body.into(),
        })?;
        response.rest_as_u64()
    }

    /// Use a tube for subsequent puts. Returns the tube now in use.
    pub fn use_tube(&mut self, tube: &str) -> Result<String> {
        let response = self.send_command(&Command::Use {
            tube: tube.to_string(),
        })?;
        Ok(response.rest)
    }

    /// The tube currently in use
    pub fn using(&mut self) -> Result<String> {
        Ok(self.send_command(&Command::ListTubeUsed)?.rest)
    }

    // -------------------------------------------------------------------------
    // Worker commands
    // -------------------------------------------------------------------------

    /// Reserve a job, blocking until one is available
    pub fn reserve(&mut self) -> Result<Reserved> {
        self.reserve_as(Command::Reserve)
    }

    /// Reserve a job, giving up after `timeout`
    pub fn reserve_with_timeout(&mut self, timeout: impl Into<Seconds>) -> Result<Reserved> {
        self.reserve_as(Command::ReserveWithTimeout {
            timeout: timeout.into(),
        })
    }

    /// Reserve a job whose body must be UTF-8 text
    pub fn reserve_text(&mut self) -> Result<Reserved<String>> {
        self.reserve_as(Command::Reserve)
    }

    /// Reserve a text job, giving up after `timeout`
    pub fn reserve_text_with_timeout(
        &mut self,
        timeout: impl Into<Seconds>,
    ) -> Result<Reserved<String>> {
        self.reserve_as(Command::ReserveWithTimeout {
            timeout: timeout.into(),
        })
    }

    fn reserve_as<B: JobBody>(&mut self, command: Command) -> Result<Reserved<B>> {
        let response = self.send_command(&command)?;
        match response.status {
            Status::TimedOut => Ok(Reserved::TimedOut),
            Status::DeadlineSoon => Ok(Reserved::DeadlineSoon),
            _ => Ok(Reserved::Job(Job::from_response(response)?)),
        }
    }

    pub fn delete(&mut self, id: u64) -> Result<()> {
        self.send_command(&Command::Delete { id })?;
        Ok(())
    }

    /// Release a reserved job back into the ready queue
    pub fn release(&mut self, id: u64, priority: u32, delay: impl Into<Seconds>) -> Result<()> {
        self.send_command(&Command::Release {
            id,
            priority,
            delay: delay.into(),
        })?;
        Ok(())
    }

    pub fn bury(&mut self, id: u64, priority: u32) -> Result<()> {
        self.send_command(&Command::Bury { id, priority })?;
        Ok(())
    }

    /// Request more time to work on a reserved job
    pub fn touch(&mut self, id: u64) -> Result<()> {
        self.send_command(&Command::Touch { id })?;
        Ok(())
    }

    /// Add a tube to the watch list. Returns the number of watched tubes.
    pub fn watch(&mut self, tube: &str) -> Result<u64> {
        self.send_command(&Command::Watch {
            tube: tube.to_string(),
        })?
        .rest_as_u64()
    }

    /// Remove a tube from the watch list. Returns the number of watched tubes.
    pub fn ignore(&mut self, tube: &str) -> Result<u64> {
        self.send_command(&Command::Ignore {
            tube: tube.to_string(),
        })?
        .rest_as_u64()
    }

    /// Watch `tube` and ignore every other watched tube. Returns the number
    /// of watched tubes, which is 1 on success.
    pub fn watch_only(&mut self, tube: &str) -> Result<u64> {
        let mut remaining = self.watch(tube)?;

        // Parsed regardless of the configured decoder, the names are needed
        let response = self.send_command(&Command::ListTubesWatched)?;
        let text = String::from_utf8(response.body.unwrap_or_default().to_vec())?;
        let watched = match YamlDecoder.decode(&text)? {
            Document::Sequence(items) => items,
            other => {
                return Err(StalkError::Document(format!(
                    "watch list is not a sequence: {}",
                    other
                )))
            }
        };

        for other in watched.iter().filter(|t| t.as_str() != tube) {
            remaining = self.ignore(other)?;
        }
        Ok(remaining)
    }

    // -------------------------------------------------------------------------
    // Other commands
    // -------------------------------------------------------------------------

    /// Kick at most `bound` buried (or, if none are buried, delayed) jobs.
    /// Returns how many were kicked.
    pub fn kick(&mut self, bound: u64) -> Result<u64> {
        self.send_command(&Command::Kick { bound })?.rest_as_u64()
    }

    /// Kick a single buried or delayed job
    pub fn kick_job(&mut self, id: u64) -> Result<()> {
        self.send_command(&Command::KickJob { id })?;
        Ok(())
    }

    pub fn peek(&mut self, id: u64) -> Result<Option<Job>> {
        self.peek_as(Command::Peek { id })
    }

    pub fn peek_ready(&mut self) -> Result<Option<Job>> {
        self.peek_as(Command::PeekReady)
    }

    pub fn peek_delayed(&mut self) -> Result<Option<Job>> {
        self.peek_as(Command::PeekDelayed)
    }

    pub fn peek_buried(&mut self) -> Result<Option<Job>> {
        self.peek_as(Command::PeekBuried)
    }

    fn peek_as(&mut self, command: Command) -> Result<Option<Job>> {
        let response = self.send_command(&command)?;
        if response.status == Status::NotFound {
            return Ok(None);
        }
        Job::from_response(response).map(Some)
    }

    /// All existing tubes
    pub fn tubes(&mut self) -> Result<Document> {
        self.document(Command::ListTubes)
    }

    /// Tubes on the watch list
    pub fn watching(&mut self) -> Result<Document> {
        self.document(Command::ListTubesWatched)
    }

    /// Server-wide statistics
    pub fn stats(&mut self) -> Result<Document> {
        self.document(Command::Stats)
    }

    pub fn stats_tube(&mut self, tube: &str) -> Result<Document> {
        self.document(Command::StatsTube {
            tube: tube.to_string(),
        })
    }

    pub fn stats_job(&mut self, id: u64) -> Result<Document> {
        self.document(Command::StatsJob { id })
    }

    /// Stop handing out jobs from `tube` for `delay`
    pub fn pause_tube(&mut self, tube: &str, delay: impl Into<Seconds>) -> Result<()> {
        self.send_command(&Command::PauseTube {
            tube: tube.to_string(),
            delay: delay.into(),
        })?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Scoped tube context
    // -------------------------------------------------------------------------

    /// Use `tube` until the returned guard is dropped, then switch back
    pub fn temporary_use(&mut self, tube: &str) -> Result<TubeGuard<'_, S>> {
        TubeGuard::acquire(self, tube)
    }

    /// Watch `tube` until the returned guard is dropped, then ignore it
    pub fn temporary_watch(&mut self, tube: &str) -> Result<WatchGuard<'_, S>> {
        WatchGuard::acquire(self, tube)
    }

    /// Run `work` with `tube` in use, restoring the previous tube afterwards
    /// even when `work` fails. The error of `work` wins over a restore error.
    pub fn with_tube<T>(
        &mut self,
        tube: &str,
        work: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.temporary_use(tube)?;
        let outcome = work(&mut *guard);
        let restored = guard.restore();
        let value = outcome?;
        restored?;
        Ok(value)
    }

    /// Run `work` with `tube` watched, ignoring it afterwards even when `work`
    /// fails. The error of `work` wins over an ignore error.
    pub fn with_watch<T>(
        &mut self,
        tube: &str,
        work: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.temporary_watch(tube)?;
        let outcome = work(&mut *guard);
        let finished = guard.finish();
        let value = outcome?;
        finished?;
        Ok(value)
    }
}
