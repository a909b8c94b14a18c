//! Connection registry: who is connected, on which transport, to which session.
//!
//! The registry is shared by every connection handler. All access goes through
//! one mutex, and a broadcast sends and evicts closed handles in one pass
//! while holding it.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace};

use crate::protocol::{GameId, ServerMessage};

/// Outbound half of a client connection.
/// Sending is best effort and must not block on the network.
pub trait Transport: Send + Sync {
    /// Returns false once the connection can no longer deliver messages.
    fn is_open(&self) -> bool;

    /// Hand one text frame to the connection.
    fn send(&self, text: &str) -> io::Result<()>;
}

/// Shared handle to a connection's transport.
pub type Handle = Arc<dyn Transport>;

/// Transport backed by an in-process channel.
/// The receiving end is drained by a writer (a socket writer thread, or a test).
#[derive(Debug)]
pub struct ChannelTransport {
    sender: Mutex<Option<Sender<String>>>,
    open: AtomicBool,
}

impl ChannelTransport {
    pub fn new() -> (Arc<Self>, Receiver<String>) {
        let (sender, receiver) = mpsc::channel();
        let transport = Self {
            sender: Mutex::new(Some(sender)),
            open: AtomicBool::new(true),
        };
        (Arc::new(transport), receiver)
    }

    /// Mark closed and drop the sender so the receiving end disconnects.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl Transport for ChannelTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, text: &str) -> io::Result<()> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;

        sender.send(text.to_string()).map_err(|_| {
            self.open.store(false, Ordering::SeqCst);
            io::Error::from(io::ErrorKind::BrokenPipe)
        })
    }
}

/// A registered participant.
#[derive(Clone)]
struct Connection {
    session: GameId,
    handle: Handle,
}

/// Concurrency safe map from identity to (transport handle, session).
/// An identity is attached to at most one session at a time.
#[derive(Default)]
pub struct Registry {
    connections: Mutex<HashMap<String, Connection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Connection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `identity` on `session`, replacing any previous entry.
    pub fn add(&self, identity: &str, session: GameId, handle: Handle) {
        let replaced = self
            .lock()
            .insert(identity.to_string(), Connection { session, handle });
        if let Some(old) = replaced {
            debug!("{identity} re-registered, was on game {}", old.session);
        }
    }

    /// Unregister `identity`. Returns true if it was registered.
    pub fn remove(&self, identity: &str) -> bool {
        self.lock().remove(identity).is_some()
    }

    /// Send to one identity. Unknown identities and closed handles are ignored.
    pub fn send_to(&self, identity: &str, message: &ServerMessage) {
        let handle = match self.lock().get(identity) {
            Some(connection) => Arc::clone(&connection.handle),
            None => return,
        };
        if handle.is_open() {
            if let Err(err) = handle.send(&message.to_string()) {
                debug!("dropped message to {identity}: {err}");
            }
        }
    }

    /// Send to every identity registered on `session` except `excluding`.
    /// Closed entries of any session are evicted in the same pass, as are
    /// entries that fail to send.
    /// Returns the number of identities the message was delivered to.
    pub fn broadcast(
        &self,
        session: GameId,
        message: &ServerMessage,
        excluding: Option<&str>,
    ) -> usize {
        let text = message.to_string();
        let mut delivered = 0;

        self.lock().retain(|identity, connection| {
            if !connection.handle.is_open() {
                trace!("evicting closed connection of {identity}");
                return false;
            }
            if connection.session != session || excluding == Some(identity.as_str()) {
                return true;
            }
            if connection.handle.send(&text).is_ok() {
                delivered += 1;
                true
            } else {
                trace!("evicting failed connection of {identity}");
                false
            }
        });
        delivered
    }

    /// Identities attached to `session`, sorted.
    pub fn members(&self, session: GameId) -> Vec<String> {
        let mut members: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, connection)| connection.session == session)
            .map(|(identity, _)| identity.clone())
            .collect();
        members.sort();
        members
    }

    /// Session `identity` is attached to, if registered.
    pub fn session_of(&self, identity: &str) -> Option<GameId> {
        self.lock().get(identity).map(|connection| connection.session)
    }

    /// Remove every entry whose handle is closed. Returns how many were removed.
    pub fn evict_closed(&self) -> usize {
        let mut connections = self.lock();
        let before = connections.len();
        connections.retain(|_, connection| connection.handle.is_open());
        before - connections.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
