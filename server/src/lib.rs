//! # Block Builder Server Library
//!
//! This library provides the authoritative server for the multiplayer
//! block-building sandbox. It owns the canonical shared state (a 30×20 grid of
//! placed blocks and the position of every joined player) and keeps every
//! connected client synchronized with it over WebSockets.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The server holds the only real copy of the grid. Clients ask for blocks to
//! be placed or deleted, and the change is echoed back to everyone, the
//! requester included, so all views follow the same sequence of writes.
//! Player movement is client-authoritative: the server stores whatever
//! position a player reports and relays it to the others.
//!
//! ### Session Management
//! Handles the lifecycle of each connection:
//! - Connection establishment (`Unjoined`)
//! - `join` handling with id and colour assignment (`Joined`)
//! - Disconnection cleanup and departure announcements
//!
//! ### State Broadcasting
//! Every change is fanned out as it happens, and a fixed ~30Hz tick sends a
//! full position snapshot so clients can interpolate remote players.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! Each WebSocket runs in its own task, but those tasks only forward events
//! to the main loop, which applies them to `ServerState` one at a time
//! between ticks. No two mutations ever race, so the registry and grid carry
//! no locks.
//!
//! ## Module Organization
//!
//! - `session`: session records, id allocation and the registry
//! - `grid`: the shared block grid
//! - `router`: inbound packet validation and dispatch
//! - `broadcast`: unicast, fan-out and the tick snapshot
//! - `lifecycle`: connect/close/error handling per connection
//! - `state`: the state owned by the event loop
//! - `network`: TCP accept loop, WebSocket tasks and the main loop
//! - `config`: bind address and tick settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::{BoxError, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BoxError> {
//!     let server = Server::bind(&ServerConfig::new("127.0.0.1", 3000)).await?;
//!     server.run().await
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod grid;
pub mod lifecycle;
pub mod network;
pub mod router;
pub mod session;
pub mod state;
