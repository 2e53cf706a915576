//! Shared test streams
//!
//! - `ScriptedStream`: replays fixed server bytes in chunks of a chosen size
//!   and records everything the client writes.
//! - `MemoryServer`: a small in-memory beanstalkd answering real commands.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Read, Write};
use std::rc::Rc;

use stalkline::{Config, Connection};

/// Bytes written by the client, shared with the test
pub type Written = Rc<RefCell<Vec<u8>>>;

// =============================================================================
// Scripted Stream
// =============================================================================

pub struct ScriptedStream {
    incoming: VecDeque<u8>,
    chunk: usize,
    written: Written,
}

impl ScriptedStream {
    pub fn new(script: &[&[u8]], chunk: usize) -> (Self, Written) {
        let written = Written::default();
        let stream = Self {
            incoming: script.iter().flat_map(|s| s.iter().copied()).collect(),
            chunk: chunk.max(1),
            written: Rc::clone(&written),
        };
        (stream, written)
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.incoming.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.incoming.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Connection over a scripted stream, whole-chunk delivery
pub fn scripted(script: &[&[u8]]) -> (Connection<ScriptedStream>, Written) {
    scripted_chunked(script, usize::MAX)
}

/// Connection over a scripted stream delivering `chunk` bytes per read
pub fn scripted_chunked(script: &[&[u8]], chunk: usize) -> (Connection<ScriptedStream>, Written) {
    let (stream, written) = ScriptedStream::new(script, chunk);
    (Connection::from_stream(stream, Config::default()), written)
}

pub fn written_text(written: &Written) -> String {
    String::from_utf8_lossy(&written.borrow()).into_owned()
}

// =============================================================================
// Failing Stream
// =============================================================================

/// Every write fails with the given error kind
pub struct BrokenStream(pub io::ErrorKind);

impl Read for BrokenStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(self.0, "broken"))
    }
}

impl Write for BrokenStream {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(self.0, "broken"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Scripted stream whose first `failures` reads fail with `kind`, as a socket
/// read timeout would, before the scripted bytes arrive
pub struct FlakyStream {
    inner: ScriptedStream,
    failures: usize,
    kind: io::ErrorKind,
}

impl FlakyStream {
    pub fn new(script: &[&[u8]], failures: usize, kind: io::ErrorKind) -> (Self, Written) {
        let (inner, written) = ScriptedStream::new(script, usize::MAX);
        (
            Self {
                inner,
                failures,
                kind,
            },
            written,
        )
    }
}

impl Read for FlakyStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::Error::new(self.kind, "read timed out"));
        }
        self.inner.read(buf)
    }
}

impl Write for FlakyStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// =============================================================================
// In-memory Server
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Ready,
    Delayed,
    Reserved,
    Buried,
}

impl JobState {
    fn name(self) -> &'static str {
        match self {
            JobState::Ready => "ready",
            JobState::Delayed => "delayed",
            JobState::Reserved => "reserved",
            JobState::Buried => "buried",
        }
    }
}

#[derive(Debug, Clone)]
struct MemJob {
    tube: String,
    priority: u32,
    body: Vec<u8>,
    state: JobState,
}

/// A single-client beanstalkd stand-in.
///
/// `reserve` without a timeout answers TIMED_OUT instead of blocking when
/// nothing is ready.
pub struct MemoryServer {
    input: Vec<u8>,
    output: VecDeque<u8>,
    chunk: usize,
    next_id: u64,
    jobs: BTreeMap<u64, MemJob>,
    using: String,
    watching: Vec<String>,
    paused: Vec<String>,
    written: Written,
}

impl MemoryServer {
    pub fn new(chunk: usize) -> (Self, Written) {
        let written = Written::default();
        let server = Self {
            input: Vec::new(),
            output: VecDeque::new(),
            chunk: chunk.max(1),
            next_id: 1,
            jobs: BTreeMap::new(),
            using: "default".to_string(),
            watching: vec!["default".to_string()],
            paused: Vec::new(),
            written: Rc::clone(&written),
        };
        (server, written)
    }

    fn process(&mut self) {
        loop {
            let Some(line_end) = self.input.windows(2).position(|w| w == b"\r\n") else {
                return;
            };
            let line = String::from_utf8_lossy(&self.input[..line_end]).into_owned();
            let words: Vec<&str> = line.split(' ').collect();

            let mut consumed = line_end + 2;
            let reply = if words[0] == "put" {
                let len: usize = match words.get(4).and_then(|w| w.parse().ok()) {
                    Some(len) => len,
                    None => {
                        self.input.drain(..consumed);
                        self.reply(b"BAD_FORMAT\r\n".to_vec());
                        continue;
                    }
                };
                if self.input.len() < consumed + len + 2 {
                    return;
                }
                let body = self.input[consumed..consumed + len].to_vec();
                let terminated = &self.input[consumed + len..consumed + len + 2] == b"\r\n";
                consumed += len + 2;
                if terminated {
                    self.put(&words, body)
                } else {
                    b"EXPECTED_CRLF\r\n".to_vec()
                }
            } else {
                self.command(&words)
            };

            self.input.drain(..consumed);
            self.reply(reply);
        }
    }

    fn reply(&mut self, bytes: Vec<u8>) {
        self.output.extend(bytes);
    }

    fn arg<T: std::str::FromStr>(words: &[&str], index: usize) -> Option<T> {
        words.get(index).and_then(|w| w.parse().ok())
    }

    fn put(&mut self, words: &[&str], body: Vec<u8>) -> Vec<u8> {
        let (Some(priority), Some(delay)) = (Self::arg::<u32>(words, 1), Self::arg::<u64>(words, 2))
        else {
            return b"BAD_FORMAT\r\n".to_vec();
        };
        let id = self.next_id;
        self.next_id += 1;
        let state = if delay > 0 {
            JobState::Delayed
        } else {
            JobState::Ready
        };
        self.jobs.insert(
            id,
            MemJob {
                tube: self.using.clone(),
                priority,
                body,
                state,
            },
        );
        format!("INSERTED {}\r\n", id).into_bytes()
    }

    fn job_frame(status: &str, id: u64, job: &MemJob) -> Vec<u8> {
        let mut out = format!("{} {} {}\r\n", status, id, job.body.len()).into_bytes();
        out.extend_from_slice(&job.body);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn document(text: String) -> Vec<u8> {
        let mut out = format!("OK {}\r\n", text.len()).into_bytes();
        out.extend_from_slice(text.as_bytes());
        out.extend_from_slice(b"\r\n");
        out
    }

    fn first_in(&self, tube: Option<&str>, state: JobState) -> Option<u64> {
        self.jobs
            .iter()
            .filter(|(_, j)| j.state == state)
            .filter(|(_, j)| match tube {
                Some(t) => j.tube == t,
                None => self.watching.contains(&j.tube) && !self.paused.contains(&j.tube),
            })
            .min_by_key(|(id, j)| (j.priority, **id))
            .map(|(id, _)| *id)
    }

    fn set_state(&mut self, words: &[&str], from: &[JobState], to: JobState, ok: &str) -> Vec<u8> {
        let Some(id) = Self::arg::<u64>(words, 1) else {
            return b"BAD_FORMAT\r\n".to_vec();
        };
        match self.jobs.get_mut(&id) {
            Some(job) if from.contains(&job.state) => {
                job.state = to;
                if let Some(priority) = Self::arg::<u32>(words, 2) {
                    job.priority = priority;
                }
                format!("{}\r\n", ok).into_bytes()
            }
            _ => b"NOT_FOUND\r\n".to_vec(),
        }
    }

    fn command(&mut self, words: &[&str]) -> Vec<u8> {
        match words[0] {
            "reserve" | "reserve-with-timeout" => {
                match self.first_in(None, JobState::Ready) {
                    Some(id) => {
                        let job = self.jobs.get_mut(&id).expect("job exists");
                        job.state = JobState::Reserved;
                        let job = job.clone();
                        Self::job_frame("RESERVED", id, &job)
                    }
                    None => b"TIMED_OUT\r\n".to_vec(),
                }
            }
            "delete" => match Self::arg::<u64>(words, 1).and_then(|id| self.jobs.remove(&id)) {
                Some(_) => b"DELETED\r\n".to_vec(),
                None => b"NOT_FOUND\r\n".to_vec(),
            },
            "release" => {
                let delayed = Self::arg::<u64>(words, 3).unwrap_or(0) > 0;
                let to = if delayed {
                    JobState::Delayed
                } else {
                    JobState::Ready
                };
                self.set_state(words, &[JobState::Reserved], to, "RELEASED")
            }
            "bury" => self.set_state(words, &[JobState::Reserved], JobState::Buried, "BURIED"),
            "touch" => {
                let Some(id) = Self::arg::<u64>(words, 1) else {
                    return b"BAD_FORMAT\r\n".to_vec();
                };
                match self.jobs.get(&id) {
                    Some(job) if job.state == JobState::Reserved => b"TOUCHED\r\n".to_vec(),
                    _ => b"NOT_FOUND\r\n".to_vec(),
                }
            }
            "kick" => {
                let bound = Self::arg::<u64>(words, 1).unwrap_or(0);
                let tube = self.using.clone();
                let source = if self.first_in(Some(tube.as_str()), JobState::Buried).is_some() {
                    JobState::Buried
                } else {
                    JobState::Delayed
                };
                let mut kicked = 0;
                while kicked < bound {
                    match self.first_in(Some(tube.as_str()), source) {
                        Some(id) => {
                            if let Some(job) = self.jobs.get_mut(&id) {
                                job.state = JobState::Ready;
                            }
                            kicked += 1;
                        }
                        None => break,
                    }
                }
                format!("KICKED {}\r\n", kicked).into_bytes()
            }
            "kick-job" => self.set_state(
                words,
                &[JobState::Buried, JobState::Delayed],
                JobState::Ready,
                "KICKED",
            ),
            "peek" => match Self::arg::<u64>(words, 1).and_then(|id| self.jobs.get(&id).map(|j| (id, j))) {
                Some((id, job)) => Self::job_frame("FOUND", id, job),
                None => b"NOT_FOUND\r\n".to_vec(),
            },
            "peek-ready" | "peek-delayed" | "peek-buried" => {
                let state = match words[0] {
                    "peek-ready" => JobState::Ready,
                    "peek-delayed" => JobState::Delayed,
                    _ => JobState::Buried,
                };
                let tube = self.using.clone();
                match self.first_in(Some(tube.as_str()), state) {
                    Some(id) => Self::job_frame("FOUND", id, &self.jobs[&id]),
                    None => b"NOT_FOUND\r\n".to_vec(),
                }
            }
            "use" => {
                self.using = words[1].to_string();
                format!("USING {}\r\n", self.using).into_bytes()
            }
            "list-tube-used" => format!("USING {}\r\n", self.using).into_bytes(),
            "watch" => {
                if !self.watching.iter().any(|t| t == words[1]) {
                    self.watching.push(words[1].to_string());
                }
                format!("WATCHING {}\r\n", self.watching.len()).into_bytes()
            }
            "ignore" => {
                if self.watching.len() == 1 && self.watching[0] == words[1] {
                    return b"NOT_IGNORED\r\n".to_vec();
                }
                self.watching.retain(|t| t != words[1]);
                format!("WATCHING {}\r\n", self.watching.len()).into_bytes()
            }
            "list-tubes-watched" => {
                let text: String = self.watching.iter().map(|t| format!("- {}\n", t)).collect();
                Self::document(format!("---\n{}", text))
            }
            "list-tubes" => {
                let mut tubes: Vec<String> = self.jobs.values().map(|j| j.tube.clone()).collect();
                tubes.push(self.using.clone());
                tubes.extend(self.watching.iter().cloned());
                tubes.sort();
                tubes.dedup();
                let text: String = tubes.iter().map(|t| format!("- {}\n", t)).collect();
                Self::document(format!("---\n{}", text))
            }
            "stats" => {
                let count = |state: JobState| self.jobs.values().filter(|j| j.state == state).count();
                Self::document(format!(
                    "---\ncurrent-jobs-ready: {}\ncurrent-jobs-reserved: {}\ncurrent-jobs-buried: {}\ncurrent-jobs-delayed: {}\n",
                    count(JobState::Ready),
                    count(JobState::Reserved),
                    count(JobState::Buried),
                    count(JobState::Delayed),
                ))
            }
            "stats-job" => match Self::arg::<u64>(words, 1).and_then(|id| self.jobs.get(&id).map(|j| (id, j))) {
                Some((id, job)) => Self::document(format!(
                    "---\nid: {}\ntube: {}\nstate: {}\npri: {}\n",
                    id,
                    job.tube,
                    job.state.name(),
                    job.priority
                )),
                None => b"NOT_FOUND\r\n".to_vec(),
            },
            "stats-tube" => {
                let tube = words[1];
                if self.knows_tube(tube) {
                    let ready = self
                        .jobs
                        .values()
                        .filter(|j| j.tube == tube && j.state == JobState::Ready)
                        .count();
                    Self::document(format!("---\nname: {}\ncurrent-jobs-ready: {}\n", tube, ready))
                } else {
                    b"NOT_FOUND\r\n".to_vec()
                }
            }
            "pause-tube" => {
                let tube = words[1];
                if self.knows_tube(tube) {
                    self.paused.push(tube.to_string());
                    b"PAUSED\r\n".to_vec()
                } else {
                    b"NOT_FOUND\r\n".to_vec()
                }
            }
            "quit" => Vec::new(),
            _ => b"UNKNOWN_COMMAND\r\n".to_vec(),
        }
    }

    fn knows_tube(&self, tube: &str) -> bool {
        self.using == tube
            || self.watching.iter().any(|t| t == tube)
            || self.jobs.values().any(|j| j.tube == tube)
    }
}

impl Read for MemoryServer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.output.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.output.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl Write for MemoryServer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.borrow_mut().extend_from_slice(buf);
        self.input.extend_from_slice(buf);
        self.process();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Connection to a fresh in-memory server
pub fn memory_connection(chunk: usize) -> (Connection<MemoryServer>, Written) {
    let (server, written) = MemoryServer::new(chunk);
    (Connection::from_stream(server, Config::default()), written)
}
