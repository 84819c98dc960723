//! Wire messages exchanged with the game server.
//!
//! Inbound payloads come in several historical shapes (nested vs. flat join
//! messages, camelCase id fields, aliased type tags). They are normalized here
//! into the closed [`ServerMessage`] set so nothing downstream has to sniff
//! raw fields.

use crate::error::DecodeError;
use crate::{color_for_id, short_name, Position, SPAWN_POSITION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One player as described by a full-state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub player_id: String,
    pub name: String,
    pub color: String,
    pub position: Position,
    pub online: bool,
}

/// A player announced by a join message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedPlayer {
    pub player_id: String,
    pub name: String,
    pub color: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `game_state`: supersedes everything known so far.
    GameState { players: Vec<SnapshotEntry> },
    /// `player_move` and `player_moved`.
    PlayerMoved { player_id: String, position: Position },
    /// `player_join`.
    PlayerJoined(JoinedPlayer),
    /// `player_reconnect`: a known name came back under a fresh id.
    PlayerReconnected {
        player_id: String,
        player_name: String,
        color: Option<String>,
    },
    /// `player_left` and `client_disconnected`.
    PlayerLeft { player_id: String },
    Unknown { kind: String },
}

impl ServerMessage {
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingType)?
            .to_string();

        match kind.as_str() {
            "game_state" => decode_game_state(value),
            "player_move" | "player_moved" => decode_move(value),
            "player_join" => decode_join(value),
            "player_reconnect" => decode_reconnect(value),
            "player_left" | "client_disconnected" => decode_left(value),
            _ => Ok(ServerMessage::Unknown { kind }),
        }
    }

    /// Canonical tag, used in logs.
    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::GameState { .. } => "game_state",
            ServerMessage::PlayerMoved { .. } => "player_move",
            ServerMessage::PlayerJoined(_) => "player_join",
            ServerMessage::PlayerReconnected { .. } => "player_reconnect",
            ServerMessage::PlayerLeft { .. } => "player_left",
            ServerMessage::Unknown { kind } => kind,
        }
    }
}

/// Messages this client sends. Nothing else ever goes out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    PlayerJoin {
        player_id: String,
        player_name: String,
        color: String,
        position: Position,
    },
    PlayerMove {
        player_id: String,
        position: Position,
    },
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Deserialize)]
struct WireGameState {
    data: Option<BTreeMap<String, WireSnapshotPlayer>>,
}

#[derive(Debug, Deserialize)]
struct WireSnapshotPlayer {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    position: Option<Position>,
    #[serde(default)]
    online: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct WireMove {
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default, rename = "playerId")]
    player_id_camel: Option<String>,
    #[serde(default)]
    position: Option<Position>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePartialPosition {
    #[serde(default)]
    x: Option<i32>,
    #[serde(default)]
    y: Option<i32>,
}

impl WirePartialPosition {
    fn or_spawn(&self) -> Position {
        Position {
            x: self.x.unwrap_or(SPAWN_POSITION.x),
            y: self.y.unwrap_or(SPAWN_POSITION.y),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireNestedPlayer {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    x: Option<i32>,
    #[serde(default)]
    y: Option<i32>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "playerName")]
    player_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireJoin {
    #[serde(default)]
    player: Option<WireNestedPlayer>,
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default)]
    player_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    position: Option<WirePartialPosition>,
}

#[derive(Debug, Deserialize)]
struct WireReconnect {
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default)]
    player_name: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireLeft {
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default, rename = "playerId")]
    player_id_camel: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
}

fn shape<T: DeserializeOwned>(kind: &'static str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::Shape { kind, source })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn decode_game_state(value: Value) -> Result<ServerMessage, DecodeError> {
    let wire: WireGameState = shape("game_state", value)?;
    let data = wire.data.ok_or(DecodeError::MissingField {
        kind: "game_state",
        field: "data",
    })?;

    let players = data
        .into_iter()
        .map(|(player_id, player)| SnapshotEntry {
            name: non_empty(player.name).unwrap_or_else(|| short_name(&player_id)),
            color: non_empty(player.color).unwrap_or_else(|| color_for_id(&player_id)),
            position: player.position.unwrap_or_default(),
            online: player.online.unwrap_or(false),
            player_id,
        })
        .collect();

    Ok(ServerMessage::GameState { players })
}

fn decode_move(value: Value) -> Result<ServerMessage, DecodeError> {
    let wire: WireMove = shape("player_move", value)?;
    let player_id = non_empty(wire.player_id)
        .or_else(|| non_empty(wire.player_id_camel))
        .ok_or(DecodeError::MissingField {
            kind: "player_move",
            field: "player_id",
        })?;
    let position = wire.position.ok_or(DecodeError::MissingField {
        kind: "player_move",
        field: "position",
    })?;

    Ok(ServerMessage::PlayerMoved {
        player_id,
        position,
    })
}

fn decode_join(value: Value) -> Result<ServerMessage, DecodeError> {
    let wire: WireJoin = shape("player_join", value)?;
    let missing_id = DecodeError::MissingField {
        kind: "player_join",
        field: "player_id",
    };

    let joined = match wire.player {
        Some(nested) => {
            let player_id = non_empty(nested.id).ok_or(missing_id)?;
            JoinedPlayer {
                name: non_empty(nested.name)
                    .or_else(|| non_empty(nested.player_name))
                    .unwrap_or_else(|| short_name(&player_id)),
                color: non_empty(nested.color).unwrap_or_else(|| color_for_id(&player_id)),
                position: Position {
                    x: nested.x.unwrap_or(SPAWN_POSITION.x),
                    y: nested.y.unwrap_or(SPAWN_POSITION.y),
                },
                player_id,
            }
        }
        None => {
            let player_id = non_empty(wire.player_id).ok_or(missing_id)?;
            JoinedPlayer {
                name: non_empty(wire.player_name)
                    .or_else(|| non_empty(wire.name))
                    .unwrap_or_else(|| short_name(&player_id)),
                color: non_empty(wire.color).unwrap_or_else(|| color_for_id(&player_id)),
                position: wire
                    .position
                    .map(|p| p.or_spawn())
                    .unwrap_or(SPAWN_POSITION),
                player_id,
            }
        }
    };

    Ok(ServerMessage::PlayerJoined(joined))
}

fn decode_reconnect(value: Value) -> Result<ServerMessage, DecodeError> {
    let wire: WireReconnect = shape("player_reconnect", value)?;
    let player_id = non_empty(wire.player_id).ok_or(DecodeError::MissingField {
        kind: "player_reconnect",
        field: "player_id",
    })?;
    let player_name = non_empty(wire.player_name).ok_or(DecodeError::MissingField {
        kind: "player_reconnect",
        field: "player_name",
    })?;

    Ok(ServerMessage::PlayerReconnected {
        player_id,
        player_name,
        color: non_empty(wire.color),
    })
}

fn decode_left(value: Value) -> Result<ServerMessage, DecodeError> {
    let wire: WireLeft = shape("player_left", value)?;
    let player_id = non_empty(wire.player_id)
        .or_else(|| non_empty(wire.player_id_camel))
        .or_else(|| non_empty(wire.client_id))
        .ok_or(DecodeError::MissingField {
            kind: "player_left",
            field: "player_id",
        })?;

    Ok(ServerMessage::PlayerLeft { player_id })
}
