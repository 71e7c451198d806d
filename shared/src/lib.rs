use serde::{de, Deserialize, Deserializer, Serialize};

pub const GRID_WIDTH: usize = 30;
pub const GRID_HEIGHT: usize = 20;
pub const SPAWN_X_MIN: f64 = 150.0;
pub const SPAWN_X_MAX: f64 = 450.0;
pub const SPAWN_Y: f64 = 50.0;

pub const PALETTE: [&str; 8] = [
    "#ff69b4", "#FFD700", "#00CED1", "#00FF00", "#FF6347", "#FF4500", "#9370DB", "#20B2AA",
];

/// Row-major grid contents as sent on the wire: `GRID_HEIGHT` rows of `GRID_WIDTH` cells.
pub type GridCells = Vec<Vec<Option<String>>>;

/// Colour assigned to a player, derived from its id alone.
pub fn player_color(id: u32) -> &'static str {
    PALETTE[(id.wrapping_sub(1) as usize) % PALETTE.len()]
}

/// Reads a grid coordinate, accepting any JSON number with no fractional part (`5` or `5.0`).
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value.fract() == 0.0 {
        Ok(value as i64)
    } else {
        Err(de::Error::custom(format!(
            "expected a whole-number coordinate, got {}",
            value
        )))
    }
}

/// Envelopes sent by clients. Unrecognized `type` values decode to `Unknown`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientPacket {
    Join {
        name: String,
    },
    MovePlayer {
        x: f64,
        y: f64,
    },
    PlaceBlock {
        #[serde(deserialize_with = "whole_number")]
        x: i64,
        #[serde(deserialize_with = "whole_number")]
        y: i64,
        color: String,
    },
    DeleteBlock {
        #[serde(deserialize_with = "whole_number")]
        x: i64,
        #[serde(deserialize_with = "whole_number")]
        y: i64,
    },
    #[serde(other)]
    Unknown,
}

impl ClientPacket {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Envelopes sent by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerPacket {
    YourId {
        id: u32,
    },
    GridUpdate {
        grid: GridCells,
    },
    PlayersList {
        players: Vec<PlayerInfo>,
    },
    PlayerJoined {
        #[serde(rename = "playerId")]
        player_id: u32,
        name: String,
        x: f64,
        y: f64,
        color: String,
    },
    PlayerMove {
        #[serde(rename = "playerId")]
        player_id: u32,
        x: f64,
        y: f64,
    },
    BlockPlaced {
        x: i64,
        y: i64,
        color: String,
    },
    BlockDeleted {
        x: i64,
        y: i64,
    },
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: u32,
    },
    PlayersUpdate {
        players: Vec<PlayerInfo>,
    },
}

impl ServerPacket {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the envelope, as it appears in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerPacket::YourId { .. } => "yourId",
            ServerPacket::GridUpdate { .. } => "gridUpdate",
            ServerPacket::PlayersList { .. } => "playersList",
            ServerPacket::PlayerJoined { .. } => "playerJoined",
            ServerPacket::PlayerMove { .. } => "playerMove",
            ServerPacket::BlockPlaced { .. } => "blockPlaced",
            ServerPacket::BlockDeleted { .. } => "blockDeleted",
            ServerPacket::PlayerLeft { .. } => "playerLeft",
            ServerPacket::PlayersUpdate { .. } => "playersUpdate",
        }
    }
}

/// Public view of a player, shared with every client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerInfo {
    pub id: u32,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
}

impl PlayerInfo {
    pub fn new(id: u32, name: &str, x: f64, y: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            x,
            y,
            color: player_color(id).to_string(),
        }
    }
}
