//! Plain-text rendition of the grid and the player list

use crate::game::ConnectionStatus;
use crate::roster::{Player, Roster};
use shared::{GRID_HEIGHT, GRID_WIDTH};

const EMPTY_CELL: char = '.';
const OPERATOR_CELL: char = '@';
const CROWDED_CELL: char = '#';
const HIGHLIGHT_CELL: char = '*';

#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl TextRenderer {
    pub fn new() -> Self {
        Self
    }

    /// One line per grid row. Later rules win: a highlighted player shows
    /// `*` even on a crowded cell.
    pub fn render_grid(&self, roster: &Roster) -> Vec<String> {
        let highlighted = roster.highlighted().map(|p| p.id.as_str());

        (0..GRID_HEIGHT)
            .map(|y| {
                (0..GRID_WIDTH)
                    .map(|x| {
                        let here = roster.players_at(x, y);
                        if here.iter().any(|p| Some(p.id.as_str()) == highlighted) {
                            HIGHLIGHT_CELL
                        } else {
                            match here.as_slice() {
                                [] => EMPTY_CELL,
                                [player] => player_glyph(player),
                                _ => CROWDED_CELL,
                            }
                        }
                    })
                    .collect()
            })
            .collect()
    }

    pub fn render_players(&self, roster: &Roster) -> Vec<String> {
        let current = roster.current_player().map(|p| p.id.as_str());

        roster
            .players()
            .iter()
            .map(|player| {
                let marker = if Some(player.id.as_str()) == current {
                    ">"
                } else {
                    " "
                };
                format!(
                    "{} {:<16} {:<28} ({:>2}, {:>2}) {:<7} {}",
                    marker,
                    player.display_name(),
                    player.id,
                    player.position.x,
                    player.position.y,
                    if player.online { "online" } else { "offline" },
                    player.color
                )
            })
            .collect()
    }

    pub fn render_status(&self, roster: &Roster, status: ConnectionStatus) -> String {
        let you = match roster.current_player() {
            Some(player) => format!(
                "{} at ({}, {})",
                player.display_name(),
                player.position.x,
                player.position.y
            ),
            None => "not placed".to_string(),
        };
        format!(
            "[{}] {} players ({} online) | you: {}",
            status,
            roster.len(),
            roster.online_count(),
            you
        )
    }
}

fn player_glyph(player: &Player) -> char {
    if player.is_operator {
        return OPERATOR_CELL;
    }
    let initial = player.display_name().chars().next().unwrap_or('?');
    if player.online {
        initial.to_ascii_uppercase()
    } else {
        initial.to_ascii_lowercase()
    }
}
