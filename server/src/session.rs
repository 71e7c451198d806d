//! Session registry for joined players
//!
//! This module owns the server-side record of every player that has completed
//! `join`, including:
//! - Monotonic id allocation (ids start at 1 and are never reused)
//! - Colour assignment derived from the id
//! - The outbound handle used to reach each player's connection
//! - Public snapshots used to bootstrap new joiners and drive the tick
//!
//! The registry is owned by the server's event loop, which processes one
//! event at a time, so it carries no locks of its own.

use log::info;
use shared::{player_color, PlayerInfo};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// Outbound half of a connection: serialized text frames queued for the socket writer.
pub type ClientSender = mpsc::UnboundedSender<String>;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("session {0} is already registered")]
    DuplicateId(u32),
}

/// A joined player and the handle of the connection it arrived on
#[derive(Debug)]
pub struct Session {
    /// Unique id assigned by the registry
    pub id: u32,
    /// Display name supplied by the client
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Palette colour, fixed by the id
    pub color: &'static str,
    /// Queue feeding this player's socket writer
    pub sender: ClientSender,
}

impl Session {
    pub fn new(id: u32, name: String, x: f64, y: f64, sender: ClientSender) -> Self {
        Self {
            id,
            name,
            x,
            y,
            color: player_color(id),
            sender,
        }
    }

    /// Returns true while the connection behind this session can still accept frames
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Public fields of the session, without the channel handle
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo::new(self.id, &self.name, self.x, self.y)
    }
}

/// Authoritative map from session id to session record
///
/// Sessions are kept ordered by id so snapshots and fan-out visit players
/// in join order.
pub struct SessionRegistry {
    sessions: BTreeMap<u32, Session>,
    next_session_id: u32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_session_id: 1,
        }
    }

    /// Hands out the next session id
    ///
    /// Ids are strictly increasing for the lifetime of the registry, whether
    /// or not the previously allocated ids were ever registered or removed.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_session_id;
        self.next_session_id += 1;
        id
    }

    /// Inserts a session, refusing to overwrite an existing id
    pub fn register(&mut self, session: Session) -> Result<(), SessionError> {
        if self.sessions.contains_key(&session.id) {
            return Err(SessionError::DuplicateId(session.id));
        }

        info!("Session {} registered as '{}'", session.id, session.name);
        self.sessions.insert(session.id, session);
        Ok(())
    }

    /// Removes a session, returning it if it was present
    pub fn remove(&mut self, id: u32) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Public fields of every registered session, ordered by id
    pub fn snapshot(&self) -> Vec<PlayerInfo> {
        self.sessions.values().map(Session::info).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Returns the number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
