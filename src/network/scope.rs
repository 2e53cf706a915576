//! Scoped tube context
//!
//! Guards that switch the used tube or add a watched tube, and undo the change
//! when they go out of scope, including on early return, `?` and unwinding.

use std::io::{Read, Write};
use std::ops::{Deref, DerefMut};

use super::Connection;
use crate::error::Result;
use crate::protocol::validate_tube_name;

/// Keeps a tube in use until dropped, then switches back to the previous one
pub struct TubeGuard<'a, S: Read + Write> {
    conn: &'a mut Connection<S>,
    previous: String,
    done: bool,
}

impl<'a, S: Read + Write> TubeGuard<'a, S> {
    pub(crate) fn acquire(conn: &'a mut Connection<S>, tube: &str) -> Result<Self> {
        validate_tube_name(tube)?;
        let previous = conn.using()?;
        conn.use_tube(tube)?;

        Ok(Self {
            conn,
            previous,
            done: false,
        })
    }

    /// Tube that will be restored
    pub fn previous(&self) -> &str {
        &self.previous
    }

    /// Switch back now and report the outcome
    pub fn restore(mut self) -> Result<()> {
        self.done = true;
        self.conn.use_tube(&self.previous).map(|_| ())
    }
}

impl<S: Read + Write> Deref for TubeGuard<'_, S> {
    type Target = Connection<S>;

    fn deref(&self) -> &Self::Target {
        &*self.conn
    }
}

impl<S: Read + Write> DerefMut for TubeGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.conn
    }
}

impl<S: Read + Write> Drop for TubeGuard<'_, S> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = self.conn.use_tube(&self.previous) {
            tracing::warn!("failed to switch back to tube '{}': {}", self.previous, e);
        }
    }
}

/// Keeps a tube on the watch list until dropped, then ignores it
pub struct WatchGuard<'a, S: Read + Write> {
    conn: &'a mut Connection<S>,
    tube: String,
    done: bool,
}

impl<'a, S: Read + Write> WatchGuard<'a, S> {
    pub(crate) fn acquire(conn: &'a mut Connection<S>, tube: &str) -> Result<Self> {
        conn.watch(tube)?;

        Ok(Self {
            conn,
            tube: tube.to_string(),
            done: false,
        })
    }

    /// The temporarily watched tube
    pub fn tube(&self) -> &str {
        &self.tube
    }

    /// Ignore the tube now. Returns the remaining watch-list size.
    pub fn finish(mut self) -> Result<u64> {
        self.done = true;
        self.conn.ignore(&self.tube)
    }
}

impl<S: Read + Write> Deref for WatchGuard<'_, S> {
    type Target = Connection<S>;

    fn deref(&self) -> &Self::Target {
        &*self.conn
    }
}

impl<S: Read + Write> DerefMut for WatchGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.conn
    }
}

impl<S: Read + Write> Drop for WatchGuard<'_, S> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = self.conn.ignore(&self.tube) {
            tracing::warn!("failed to ignore tube '{}': {}", self.tube, e);
        }
    }
}
