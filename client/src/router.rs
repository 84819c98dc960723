//! Classifies inbound frames and applies them to a [`Reconciler`]
//!
//! The router is stateless between frames: it decodes through the configured
//! [`FrameDialect`] and invokes the matching roster operation. Nothing here is
//! fatal; undecodable frames are logged and dropped.

use crate::roster::{Player, Reconciler};
use log::{debug, info, warn};
use shared::{DecodeError, Frame, FrameDecoder, FrameDialect, ServerMessage};

/// What happened to one frame.
#[derive(Debug)]
pub enum Routed {
    /// A roster operation ran for a message of this kind.
    Applied(&'static str),
    /// Informational text or a message type we do not handle.
    Ignored,
    Dropped(DecodeError),
}

impl Routed {
    pub fn is_applied(&self) -> bool {
        matches!(self, Routed::Applied(_))
    }
}

pub struct MessageRouter {
    decoder: FrameDecoder,
}

impl MessageRouter {
    pub fn new(decoder: FrameDecoder) -> Self {
        Self { decoder }
    }

    pub fn with_dialect(dialect: Box<dyn FrameDialect>) -> Self {
        Self::new(FrameDecoder::new(dialect))
    }

    pub fn dialect_name(&self) -> &'static str {
        self.decoder.dialect_name()
    }

    pub fn route<R: Reconciler + ?Sized>(&self, text: &str, target: &mut R) -> Routed {
        match self.decoder.decode(text) {
            Ok(Frame::Message(message)) => self.dispatch(message, target),
            Ok(Frame::Text(text)) => {
                debug!("Ignoring non-JSON frame: {}", text);
                Routed::Ignored
            }
            Err(e) => {
                warn!("Dropping frame: {} (raw: {})", e, text);
                Routed::Dropped(e)
            }
        }
    }

    pub fn dispatch<R: Reconciler + ?Sized>(&self, message: ServerMessage, target: &mut R) -> Routed {
        match message {
            ServerMessage::GameState { players } => {
                info!("Received snapshot with {} players", players.len());
                target.replace_all(players.into_iter().map(Player::from).collect());
                target.deduplicate();
                Routed::Applied("game_state")
            }
            ServerMessage::PlayerMoved {
                player_id,
                position,
            } => {
                debug!("Player {} moved to ({}, {})", player_id, position.x, position.y);
                target.update_position(&player_id, position.x, position.y);
                Routed::Applied("player_move")
            }
            ServerMessage::PlayerJoined(joined) => {
                info!("Player {} joined as {}", joined.player_id, joined.name);
                target.add(Player::from(joined));
                Routed::Applied("player_join")
            }
            ServerMessage::PlayerReconnected {
                player_id,
                player_name,
                color,
            } => {
                target.reconnect(&player_id, &player_name, color.as_deref());
                target.deduplicate();
                Routed::Applied("player_reconnect")
            }
            ServerMessage::PlayerLeft { player_id } => {
                target.mark_offline(&player_id);
                Routed::Applied("player_left")
            }
            ServerMessage::Unknown { kind } => {
                debug!("Unknown message type: {}", kind);
                Routed::Ignored
            }
        }
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new(FrameDecoder::default())
    }
}
