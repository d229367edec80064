//! Collector connection state machine.
//!
//! # State Transitions
//! ```text
//! Disconnected → Connecting: connect attempt starts
//! Connecting → Connected: socket established, writer installed
//! Connecting → Disconnected: establishment failed (schedules reconnect)
//! Connected → Disconnected: write failed or stream closed (schedules reconnect)
//! ```
//!
//! There is no terminal state; the client keeps retrying while enabled.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Connection state enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl From<u8> for ConnectionState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a [`ConnectionState`].
///
/// Read by the send path and written by connect, send and the reconnect
/// loop concurrently.
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from(self.0.load(Ordering::Acquire))
    }

    /// Store a new state, returning the previous one.
    pub fn swap(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from(self.0.swap(state as u8, Ordering::AcqRel))
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}
