//! Authoritative server state driven by the event loop
//!
//! `ServerState` owns the session registry, the block grid and the table of
//! open connections. The network layer feeds it one event at a time (see
//! `lifecycle` and `router` for the handlers), so every mutation runs to
//! completion before the next one starts and the tick never sees a
//! half-applied change.

use crate::broadcast::{broadcast, players_update};
use crate::grid::Grid;
use crate::lifecycle::{Connection, ConnectionId, ConnectionState};
use crate::session::SessionRegistry;
use log::info;
use std::collections::HashMap;

pub struct ServerState {
    pub(crate) registry: SessionRegistry,
    pub(crate) grid: Grid,
    pub(crate) connections: HashMap<ConnectionId, Connection>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            registry: SessionRegistry::new(),
            grid: Grid::new(),
            connections: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Lifecycle state of a connection, or `None` once it has closed
    pub fn connection_state(&self, conn_id: ConnectionId) -> Option<ConnectionState> {
        self.connections.get(&conn_id).map(|c| c.state)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Broadcasts the position of every session to every session
    ///
    /// Runs on each tick whether or not anything moved. Returns the number of
    /// sessions the snapshot was queued for.
    pub fn tick(&self) -> usize {
        broadcast(&self.registry, &players_update(&self.registry), None)
    }

    pub fn log_status(&self) {
        info!(
            "Status: {} players, {} connections, {} blocks placed",
            self.registry.len(),
            self.connections.len(),
            self.grid.block_count()
        );
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
