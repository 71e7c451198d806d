//! Fan-out of server packets to joined sessions

use crate::session::{ClientSender, SessionRegistry};
use log::{error, warn};
use shared::ServerPacket;

/// Interval between `playersUpdate` snapshots (~30Hz)
pub const TICK_INTERVAL_MS: u64 = 33;

/// Queues a frame on one connection if it is still open
///
/// Returns true if the frame was queued.
pub fn send_frame(sender: &ClientSender, frame: &str) -> bool {
    if sender.is_closed() {
        return false;
    }

    match sender.send(frame.to_string()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to queue frame for connection: {}", e);
            false
        }
    }
}

/// Serializes and sends a packet to a single connection
pub fn send_to(sender: &ClientSender, packet: &ServerPacket) -> bool {
    match packet.to_json() {
        Ok(frame) => send_frame(sender, &frame),
        Err(e) => {
            error!("Failed to serialize {} packet: {}", packet.kind(), e);
            false
        }
    }
}

/// Sends a packet to every registered session except `exclude`
///
/// The packet is serialized once. `None` and `Some(0)` exclude nobody. A
/// session whose connection is closed is skipped, and a failed send to one
/// session does not stop delivery to the rest. Returns the number of
/// sessions the packet was queued for.
pub fn broadcast(registry: &SessionRegistry, packet: &ServerPacket, exclude: Option<u32>) -> usize {
    let frame = match packet.to_json() {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to serialize {} broadcast: {}", packet.kind(), e);
            return 0;
        }
    };

    let exclude = exclude.filter(|id| *id != 0);
    let mut delivered = 0;

    for session in registry.iter() {
        if Some(session.id) == exclude || !session.is_open() {
            continue;
        }

        if let Err(e) = session.sender.send(frame.clone()) {
            warn!("Failed to send {} to session {}: {}", packet.kind(), session.id, e);
            continue;
        }
        delivered += 1;
    }

    delivered
}

/// Position snapshot of every session, sent on each tick
pub fn players_update(registry: &SessionRegistry) -> ServerPacket {
    ServerPacket::PlayersUpdate {
        players: registry.snapshot(),
    }
}
