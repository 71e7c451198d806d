//! Validation and dispatch of inbound client packets

use crate::broadcast::{broadcast, send_to};
use crate::lifecycle::{Connection, ConnectionId, ConnectionState};
use crate::session::Session;
use crate::state::ServerState;
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{ClientPacket, ServerPacket, SPAWN_X_MAX, SPAWN_X_MIN, SPAWN_Y};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("payload is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("malformed packet: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes one inbound frame
pub fn parse_packet(payload: &[u8]) -> Result<ClientPacket, PacketError> {
    let text = std::str::from_utf8(payload)?;
    Ok(ClientPacket::from_json(text)?)
}

/// Random spawn point inside the fixed horizontal band
fn spawn_position() -> (f64, f64) {
    let x = rand::thread_rng().gen_range(SPAWN_X_MIN..SPAWN_X_MAX);
    (x, SPAWN_Y)
}

impl ServerState {
    /// Handles one raw frame from a connection
    ///
    /// Malformed frames are logged and dropped; the connection stays open.
    pub fn handle_frame(&mut self, conn_id: ConnectionId, payload: &[u8]) {
        match parse_packet(payload) {
            Ok(packet) => self.handle_packet(conn_id, packet),
            Err(e) => warn!("Dropping message from connection {}: {}", conn_id, e),
        }
    }

    pub fn handle_packet(&mut self, conn_id: ConnectionId, packet: ClientPacket) {
        if !self.connections.contains_key(&conn_id) {
            debug!("Ignoring packet from unknown connection {}", conn_id);
            return;
        }

        match packet {
            ClientPacket::Join { name } => self.handle_join(conn_id, name),
            ClientPacket::MovePlayer { x, y } => self.handle_move(conn_id, x, y),
            ClientPacket::PlaceBlock { x, y, color } => self.handle_place_block(x, y, color),
            ClientPacket::DeleteBlock { x, y } => self.handle_delete_block(x, y),
            ClientPacket::Unknown => debug!("Ignoring unknown packet from connection {}", conn_id),
        }
    }

    fn handle_join(&mut self, conn_id: ConnectionId, name: String) {
        let Some(connection) = self.connections.get_mut(&conn_id) else {
            return;
        };

        let id = self.registry.allocate_id();
        let (x, y) = spawn_position();
        let sender = connection.sender.clone();

        if let Err(e) = self
            .registry
            .register(Session::new(id, name.clone(), x, y, sender.clone()))
        {
            error!("Failed to register player '{}': {}", name, e);
            return;
        }
        // A repeated join moves the connection to the newest session only
        connection.state = ConnectionState::Joined(id);

        send_to(&sender, &ServerPacket::YourId { id });
        send_to(
            &sender,
            &ServerPacket::GridUpdate {
                grid: self.grid.full_snapshot(),
            },
        );
        send_to(
            &sender,
            &ServerPacket::PlayersList {
                players: self.registry.snapshot(),
            },
        );

        let joined = ServerPacket::PlayerJoined {
            player_id: id,
            name: name.clone(),
            x,
            y,
            color: shared::player_color(id).to_string(),
        };
        broadcast(&self.registry, &joined, Some(id));

        info!("Player {} ({}) joined. Total: {}", name, id, self.registry.len());
    }

    fn handle_move(&mut self, conn_id: ConnectionId, x: f64, y: f64) {
        let Some(id) = self.connections.get(&conn_id).and_then(Connection::session_id) else {
            return;
        };
        let Some(session) = self.registry.get_mut(id) else {
            return;
        };

        session.x = x;
        session.y = y;

        broadcast(
            &self.registry,
            &ServerPacket::PlayerMove { player_id: id, x, y },
            Some(id),
        );
    }

    fn handle_place_block(&mut self, x: i64, y: i64, color: String) {
        if self.grid.place(x, y, &color) {
            broadcast(&self.registry, &ServerPacket::BlockPlaced { x, y, color }, None);
        }
    }

    fn handle_delete_block(&mut self, x: i64, y: i64) {
        if self.grid.clear(x, y) {
            broadcast(&self.registry, &ServerPacket::BlockDeleted { x, y }, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use tokio::sync::mpsc;

    struct TestClient {
        conn_id: ConnectionId,
        rx: mpsc::UnboundedReceiver<String>,
    }

    impl TestClient {
        fn connect(state: &mut ServerState, conn_id: ConnectionId) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            state.on_connect(conn_id, tx);
            Self { conn_id, rx }
        }

        fn send(&self, state: &mut ServerState, json: &str) {
            state.handle_frame(self.conn_id, json.as_bytes());
        }

        fn drain(&mut self) -> Vec<ServerPacket> {
            let mut packets = Vec::new();
            while let Ok(frame) = self.rx.try_recv() {
                packets.push(ServerPacket::from_json(&frame).unwrap());
            }
            packets
        }
    }

    fn joined_pair(state: &mut ServerState) -> (TestClient, TestClient) {
        let mut a = TestClient::connect(state, 10);
        let mut b = TestClient::connect(state, 20);
        a.send(state, r#"{"type":"join","name":"alice"}"#);
        b.send(state, r#"{"type":"join","name":"bob"}"#);
        a.drain();
        b.drain();
        (a, b)
    }

    #[test]
    fn test_join_bootstraps_sender() {
        let mut state = ServerState::new();
        state.grid.place(2, 3, "#abcdef");

        let mut client = TestClient::connect(&mut state, 1);
        client.send(&mut state, r#"{"type":"join","name":"alice"}"#);

        let packets = client.drain();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0], ServerPacket::YourId { id: 1 });

        match &packets[1] {
            ServerPacket::GridUpdate { grid } => {
                assert_eq!(grid[3][2].as_deref(), Some("#abcdef"));
            }
            other => panic!("Expected gridUpdate, got {:?}", other),
        }

        match &packets[2] {
            ServerPacket::PlayersList { players } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, 1);
                assert_eq!(players[0].name, "alice");
                assert_eq!(players[0].color, "#ff69b4");
            }
            other => panic!("Expected playersList, got {:?}", other),
        }
    }

    #[test]
    fn test_join_spawns_in_band() {
        let mut state = ServerState::new();

        for conn_id in 1..50 {
            let mut client = TestClient::connect(&mut state, conn_id);
            client.send(&mut state, r#"{"type":"join","name":"p"}"#);
            client.drain();
        }

        for player in state.registry().snapshot() {
            assert!(player.x >= SPAWN_X_MIN && player.x < SPAWN_X_MAX);
            assert_approx_eq!(player.y, SPAWN_Y);
        }
    }

    #[test]
    fn test_join_announced_to_others_only() {
        let mut state = ServerState::new();
        let mut a = TestClient::connect(&mut state, 1);
        a.send(&mut state, r#"{"type":"join","name":"alice"}"#);
        a.drain();

        let mut b = TestClient::connect(&mut state, 2);
        b.send(&mut state, r#"{"type":"join","name":"bob"}"#);

        let to_a = a.drain();
        assert_eq!(to_a.len(), 1);
        match &to_a[0] {
            ServerPacket::PlayerJoined {
                player_id,
                name,
                color,
                ..
            } => {
                assert_eq!(*player_id, 2);
                assert_eq!(name, "bob");
                assert_eq!(color, "#FFD700");
            }
            other => panic!("Expected playerJoined, got {:?}", other),
        }

        let to_b = b.drain();
        assert!(to_b
            .iter()
            .all(|p| !matches!(p, ServerPacket::PlayerJoined { .. })));
        match &to_b[2] {
            ServerPacket::PlayersList { players } => assert_eq!(players.len(), 2),
            other => panic!("Expected playersList, got {:?}", other),
        }
    }

    #[test]
    fn test_move_updates_position_and_skips_mover() {
        let mut state = ServerState::new();
        let (mut a, mut b) = joined_pair(&mut state);

        a.send(&mut state, r#"{"type":"movePlayer","x":-500.5,"y":9000}"#);

        let session = state.registry().get(1).unwrap();
        assert_approx_eq!(session.x, -500.5);
        assert_approx_eq!(session.y, 9000.0);

        assert!(a.drain().is_empty());
        assert_eq!(
            b.drain(),
            vec![ServerPacket::PlayerMove {
                player_id: 1,
                x: -500.5,
                y: 9000.0
            }]
        );
    }

    #[test]
    fn test_move_before_join_is_ignored() {
        let mut state = ServerState::new();
        let (mut a, _b) = joined_pair(&mut state);

        let mut c = TestClient::connect(&mut state, 30);
        c.send(&mut state, r#"{"type":"movePlayer","x":1,"y":2}"#);

        assert!(a.drain().is_empty());
        assert!(c.drain().is_empty());
        assert_eq!(state.registry().len(), 2);
    }

    #[test]
    fn test_place_block_echoes_to_everyone() {
        let mut state = ServerState::new();
        let (mut a, mut b) = joined_pair(&mut state);

        a.send(&mut state, r##"{"type":"placeBlock","x":5,"y":5,"color":"#ff0000"}"##);

        let expected = ServerPacket::BlockPlaced {
            x: 5,
            y: 5,
            color: "#ff0000".to_string(),
        };
        assert_eq!(a.drain(), vec![expected.clone()]);
        assert_eq!(b.drain(), vec![expected]);
        assert_eq!(state.grid().get(5, 5), Some("#ff0000"));
    }

    #[test]
    fn test_place_block_accepts_whole_float_coordinates() {
        let mut state = ServerState::new();
        let (mut a, mut b) = joined_pair(&mut state);

        a.send(&mut state, r##"{"type":"placeBlock","x":5.0,"y":6.0,"color":"#ff0000"}"##);
        a.send(&mut state, r##"{"type":"placeBlock","x":5.5,"y":6,"color":"#00ff00"}"##);

        let expected = ServerPacket::BlockPlaced {
            x: 5,
            y: 6,
            color: "#ff0000".to_string(),
        };
        assert_eq!(a.drain(), vec![expected.clone()]);
        assert_eq!(b.drain(), vec![expected]);
        assert_eq!(state.grid().get(5, 6), Some("#ff0000"));
    }

    #[test]
    fn test_delete_block_echoes_to_everyone() {
        let mut state = ServerState::new();
        let (mut a, mut b) = joined_pair(&mut state);
        state.grid.place(7, 8, "#00ff00");

        b.send(&mut state, r#"{"type":"deleteBlock","x":7,"y":8}"#);

        let expected = ServerPacket::BlockDeleted { x: 7, y: 8 };
        assert_eq!(a.drain(), vec![expected.clone()]);
        assert_eq!(b.drain(), vec![expected]);
        assert_eq!(state.grid().get(7, 8), None);
    }

    #[test]
    fn test_out_of_bounds_block_is_silent() {
        let mut state = ServerState::new();
        let (mut a, mut b) = joined_pair(&mut state);

        let messages = [
            r##"{"type":"placeBlock","x":30,"y":0,"color":"#ff0000"}"##,
            r##"{"type":"placeBlock","x":0,"y":20,"color":"#ff0000"}"##,
            r##"{"type":"placeBlock","x":-1,"y":3,"color":"#ff0000"}"##,
            r#"{"type":"deleteBlock","x":30,"y":20}"#,
            r#"{"type":"deleteBlock","x":0,"y":-7}"#,
        ];

        for message in messages {
            a.send(&mut state, message);
        }

        assert!(a.drain().is_empty());
        assert!(b.drain().is_empty());
        assert_eq!(state.grid().block_count(), 0);
    }

    #[test]
    fn test_block_from_unjoined_connection_is_applied() {
        let mut state = ServerState::new();
        let (mut a, _b) = joined_pair(&mut state);

        let c = TestClient::connect(&mut state, 30);
        c.send(&mut state, r##"{"type":"placeBlock","x":0,"y":0,"color":"#111111"}"##);

        assert_eq!(state.grid().get(0, 0), Some("#111111"));
        assert_eq!(a.drain().len(), 1);
    }

    #[test]
    fn test_malformed_and_unknown_messages_are_dropped() {
        let mut state = ServerState::new();
        let (mut a, mut b) = joined_pair(&mut state);

        a.send(&mut state, "{not json");
        a.send(&mut state, r#"{"name":"missing type"}"#);
        a.send(&mut state, r#"{"type":"placeBlock","x":"five","y":5,"color":"red"}"#);
        a.send(&mut state, r#"{"type":"chat","text":"hello"}"#);
        state.handle_frame(a.conn_id, &[0xff, 0xfe, 0x00]);

        assert!(a.drain().is_empty());
        assert!(b.drain().is_empty());
        assert_eq!(state.connection_state(a.conn_id), Some(ConnectionState::Joined(1)));

        // The connection keeps working afterwards
        a.send(&mut state, r#"{"type":"movePlayer","x":1,"y":1}"#);
        assert_eq!(b.drain().len(), 1);
    }

    #[test]
    fn test_packet_from_unknown_connection_is_ignored() {
        let mut state = ServerState::new();
        state.handle_packet(
            99,
            ClientPacket::Join {
                name: "ghost".to_string(),
            },
        );
        assert!(state.registry().is_empty());
    }

    #[test]
    fn test_parse_packet_errors() {
        assert!(matches!(
            parse_packet(&[0xc3, 0x28]),
            Err(PacketError::NotUtf8(_))
        ));
        assert!(matches!(
            parse_packet(b"{}"),
            Err(PacketError::Malformed(_))
        ));
        assert_eq!(
            parse_packet(br#"{"type":"deleteBlock","x":1,"y":2}"#).unwrap(),
            ClientPacket::DeleteBlock { x: 1, y: 2 }
        );
    }
}
