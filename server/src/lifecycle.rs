//! Connection lifecycle: connect, join, and disconnect handling
//!
//! Every connection starts `Unjoined`, becomes `Joined` once a `join` has
//! been accepted (see `router`), and is dropped from the table when its
//! channel closes. Closing a joined connection removes its session and tells
//! everyone else it left. Channel errors are only logged; the close that
//! follows does the cleanup.

use crate::broadcast::broadcast;
use crate::session::ClientSender;
use crate::state::ServerState;
use log::{debug, error, info};
use shared::ServerPacket;

/// Server-local identifier of a transport connection, distinct from session ids
pub type ConnectionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Channel is open but no `join` has been accepted yet
    Unjoined,
    /// A `join` was accepted and created the given session
    Joined(u32),
}

/// An open connection and its outbound queue
#[derive(Debug)]
pub struct Connection {
    pub sender: ClientSender,
    pub state: ConnectionState,
}

impl Connection {
    pub fn new(sender: ClientSender) -> Self {
        Self {
            sender,
            state: ConnectionState::Unjoined,
        }
    }

    /// Id of the newest session created on this connection
    pub fn session_id(&self) -> Option<u32> {
        match self.state {
            ConnectionState::Joined(id) => Some(id),
            ConnectionState::Unjoined => None,
        }
    }
}

impl ServerState {
    /// Records a newly opened connection
    pub fn on_connect(&mut self, conn_id: ConnectionId, sender: ClientSender) {
        debug!("Connection {} opened", conn_id);
        self.connections.insert(conn_id, Connection::new(sender));
    }

    /// Tears down a closed connection
    ///
    /// Returns the id of the session that was removed, if any. Closing an
    /// unjoined or already closed connection does nothing.
    pub fn on_close(&mut self, conn_id: ConnectionId) -> Option<u32> {
        let connection = self.connections.remove(&conn_id)?;
        let id = connection.session_id()?;
        let session = self.registry.remove(id)?;

        broadcast(&self.registry, &ServerPacket::PlayerLeft { player_id: id }, None);

        info!(
            "Player {} ({}) left. Total: {}",
            session.name,
            id,
            self.registry.len()
        );
        Some(id)
    }

    /// Logs a channel error; cleanup waits for the close event
    pub fn on_error(&self, conn_id: ConnectionId, err: &str) {
        match self.connections.get(&conn_id).and_then(Connection::session_id) {
            Some(id) => error!("WebSocket error on connection {} (player {}): {}", conn_id, id, err),
            None => error!("WebSocket error on connection {}: {}", conn_id, err),
        }
    }
}
