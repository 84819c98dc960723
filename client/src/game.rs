use crate::identity::Operator;
use crate::roster::{Player, Roster};
use crate::router::{MessageRouter, Routed};
use log::{debug, info};
use shared::{is_valid_grid_position, short_name, ClientMessage, Position, SPAWN_POSITION};
use std::fmt;

/// Mirrors the WebSocket ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Closing,
    Disconnected,
}

impl ConnectionStatus {
    pub fn ready_state(&self) -> u8 {
        match self {
            ConnectionStatus::Connecting => 0,
            ConnectionStatus::Connected => 1,
            ConnectionStatus::Closing => 2,
            ConnectionStatus::Disconnected => 3,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Closing => "closing",
            ConnectionStatus::Disconnected => "disconnected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveRejected {
    NotConnected(ConnectionStatus),
    OutOfGrid(Position),
    NoOperator,
}

impl fmt::Display for MoveRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveRejected::NotConnected(status) => write!(f, "not connected ({})", status),
            MoveRejected::OutOfGrid(p) => write!(f, "({}, {}) is outside the grid", p.x, p.y),
            MoveRejected::NoOperator => f.write_str("no operator identity"),
        }
    }
}

/// Everything one play session owns: the roster, the router feeding it, and
/// the connection status. Created when the session starts, dropped when it ends.
pub struct GameSession {
    roster: Roster,
    router: MessageRouter,
    status: ConnectionStatus,
}

impl GameSession {
    pub fn new(operator: Operator, router: MessageRouter) -> Self {
        Self {
            roster: Roster::new(operator),
            router,
            status: ConnectionStatus::Disconnected,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            info!("Connection status: {} -> {}", self.status, status);
            self.status = status;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn handle_text_frame(&mut self, text: &str) -> Routed {
        self.router.route(text, &mut self.roster)
    }

    /// Join announcement for the current operator, placed at the spawn cell.
    pub fn join_message(&self) -> Option<ClientMessage> {
        let operator = self.roster.operator()?;
        let name = operator.name.trim();
        Some(ClientMessage::PlayerJoin {
            player_id: operator.id.clone(),
            player_name: if name.is_empty() {
                short_name(&operator.id)
            } else {
                name.to_string()
            },
            color: operator.color.clone(),
            position: SPAWN_POSITION,
        })
    }

    /// Validates a move of the operator's avatar, applies it locally and
    /// returns the message to send.
    pub fn request_move(&mut self, x: i32, y: i32) -> Result<ClientMessage, MoveRejected> {
        if !self.is_connected() {
            return Err(MoveRejected::NotConnected(self.status));
        }
        if !is_valid_grid_position(x, y) {
            return Err(MoveRejected::OutOfGrid(Position::new(x, y)));
        }
        let operator = self.roster.operator().cloned().ok_or(MoveRejected::NoOperator)?;

        if self.roster.get(&operator.id).is_some() {
            self.roster.update_position(&operator.id, x, y);
        } else {
            debug!("Placing operator {} for the first time", operator.id);
            let name = if operator.name.trim().is_empty() {
                short_name(&operator.id)
            } else {
                operator.name.trim().to_string()
            };
            self.roster.add(
                Player::new(operator.id.clone(), Position::new(x, y), operator.color.clone())
                    .with_name(name),
            );
        }

        Ok(ClientMessage::PlayerMove {
            player_id: operator.id,
            position: Position::new(x, y),
        })
    }
}
