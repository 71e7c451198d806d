//! Server network layer handling WebSocket connections and the event loop

use crate::config::ServerConfig;
use crate::lifecycle::ConnectionId;
use crate::session::ClientSender;
use crate::state::ServerState;
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        conn_id: ConnectionId,
        sender: ClientSender,
    },
    Message {
        conn_id: ConnectionId,
        payload: Vec<u8>,
    },
    Error {
        conn_id: ConnectionId,
        error: String,
    },
    Closed {
        conn_id: ConnectionId,
    },
}

/// Applies one connection event to the state
fn dispatch_event(state: &mut ServerState, event: ServerEvent) {
    match event {
        ServerEvent::Connected { conn_id, sender } => state.on_connect(conn_id, sender),
        ServerEvent::Message { conn_id, payload } => state.handle_frame(conn_id, &payload),
        ServerEvent::Error { conn_id, error } => state.on_error(conn_id, &error),
        ServerEvent::Closed { conn_id } => {
            state.on_close(conn_id);
        }
    }
}

/// Writes one queued frame, returning false once the socket can no longer be written
async fn write_frame<S>(write: &mut S, conn_id: ConnectionId, frame: String) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match write.send(Message::Text(frame)).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to write to connection {}: {}", conn_id, e);
            false
        }
    }
}

/// WebSocket server owning the authoritative state
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: ServerState,
    tick_interval: Duration,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> Result<Self, BoxError> {
        let listener = TcpListener::bind(&config.addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        Ok(Server {
            listener,
            local_addr,
            state: ServerState::new(),
            tick_interval: config.tick_interval,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns task that accepts TCP connections and hands each to its own task
    fn spawn_acceptor(listener: TcpListener, event_tx: mpsc::UnboundedSender<ServerEvent>) {
        tokio::spawn(async move {
            let mut next_conn_id: ConnectionId = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let conn_id = next_conn_id;
                        next_conn_id += 1;
                        tokio::spawn(Self::run_connection(stream, addr, conn_id, event_tx.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Drives one WebSocket: forwards inbound frames as events and writes queued outbound frames
    async fn run_connection(
        stream: TcpStream,
        addr: SocketAddr,
        conn_id: ConnectionId,
        event_tx: mpsc::UnboundedSender<ServerEvent>,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake with {} failed: {}", addr, e);
                return;
            }
        };
        let (mut write, mut read) = ws_stream.split();

        let (sender, mut outbound) = mpsc::unbounded_channel::<String>();
        if event_tx
            .send(ServerEvent::Connected { conn_id, sender })
            .is_err()
        {
            return;
        }
        info!("Connection {} opened from {}", conn_id, addr);

        loop {
            tokio::select! {
                incoming = read.next() => {
                    let payload = match incoming {
                        Some(Ok(Message::Text(text))) => text.into_bytes(),
                        Some(Ok(Message::Binary(data))) => data,
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            let _ = event_tx.send(ServerEvent::Error { conn_id, error: e.to_string() });
                            break;
                        }
                    };

                    if event_tx.send(ServerEvent::Message { conn_id, payload }).is_err() {
                        break;
                    }
                }
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    if !write_frame(&mut write, conn_id, frame).await {
                        break;
                    }
                }
            }
        }

        // Sessions still holding this sender now see it as closed
        outbound.close();
        let _ = write.close().await;

        info!("Connection {} from {} closed", conn_id, addr);
        let _ = event_tx.send(ServerEvent::Closed { conn_id });
    }

    /// Main server loop
    ///
    /// Connection events and ticks are handled one at a time, so the state
    /// needs no locking.
    pub async fn run(self) -> Result<(), BoxError> {
        let Server {
            listener,
            local_addr,
            mut state,
            tick_interval: tick_duration,
        } = self;

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        Self::spawn_acceptor(listener, event_tx);

        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_interval = interval(STATUS_INTERVAL);

        info!(
            "Server started on {}, broadcasting positions every {}ms",
            local_addr,
            tick_duration.as_millis()
        );

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => dispatch_event(&mut state, event),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    state.tick();
                },

                _ = status_interval.tick() => {
                    state.log_status();
                },
            }
        }

        Ok(())
    }
}
