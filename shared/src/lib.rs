use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub mod codec;
pub mod error;
pub mod protocol;

pub use codec::{EchoPrefixDialect, Frame, FrameDecoder, FrameDialect, PlainDialect};
pub use error::DecodeError;
pub use protocol::{ClientMessage, JoinedPlayer, ServerMessage, SnapshotEntry};

pub const GRID_WIDTH: i32 = 40;
pub const GRID_HEIGHT: i32 = 25;

/// Where a player lands when the server did not say where they are.
pub const SPAWN_POSITION: Position = Position { x: 20, y: 15 };

/// Colors derived from a player id when the server sends none.
pub const PLAYER_COLORS: [&str; 10] = [
    "#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6", "#EC4899", "#06B6D4", "#84CC16",
    "#F97316", "#6366F1",
];

/// Colors an operator may pick for their own avatar.
pub const COLOR_PALETTE: [&str; 20] = [
    "#3B82F6", "#0EA5E9", "#06B6D4", "#EF4444", "#DC2626", "#EC4899", "#F43F5E", "#10B981",
    "#059669", "#22C55E", "#14B8A6", "#84CC16", "#EAB308", "#F59E0B", "#D97706", "#8B5CF6",
    "#7C3AED", "#A855F7", "#6366F1", "#F97316",
];

const NAME_PREFIXES: [&str; 10] = [
    "Shadow", "Iron", "Crystal", "Dark", "Light", "Storm", "Fire", "Ice", "Thunder", "Mystic",
];
const NAME_SUFFIXES: [&str; 10] = [
    "blade", "heart", "fury", "storm", "shadow", "flame", "frost", "thunder", "spirit", "ward",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_within_grid(&self) -> bool {
        is_valid_grid_position(self.x, self.y)
    }

    /// Pulls the position onto the nearest cell of the grid.
    pub fn clamped(&self) -> Self {
        Self {
            x: self.x.clamp(0, GRID_WIDTH - 1),
            y: self.y.clamp(0, GRID_HEIGHT - 1),
        }
    }
}

pub fn is_valid_grid_position(x: i32, y: i32) -> bool {
    (0..GRID_WIDTH).contains(&x) && (0..GRID_HEIGHT).contains(&y)
}

/// Deterministic color for a player id: sum of its characters over the palette.
pub fn color_for_id(player_id: &str) -> String {
    let len = PLAYER_COLORS.len() as u64;
    let index = player_id
        .chars()
        .fold(0u64, |acc, c| (acc + c as u64) % len);
    PLAYER_COLORS[index as usize].to_string()
}

pub fn random_palette_color() -> String {
    let mut rng = rand::thread_rng();
    COLOR_PALETTE
        .choose(&mut rng)
        .copied()
        .unwrap_or(COLOR_PALETTE[0])
        .to_string()
}

/// Display name used for players that never told us theirs: `P` plus the
/// last three characters of the id.
pub fn short_name(player_id: &str) -> String {
    let chars: Vec<char> = player_id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(3)..].iter().collect();
    format!("P{}", tail)
}

pub fn generate_random_name() -> String {
    let mut rng = rand::thread_rng();
    let prefix = NAME_PREFIXES.choose(&mut rng).copied().unwrap_or("Shadow");
    let suffix = NAME_SUFFIXES.choose(&mut rng).copied().unwrap_or("blade");
    format!("{}{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_bounds() {
        assert!(is_valid_grid_position(0, 0));
        assert!(is_valid_grid_position(GRID_WIDTH - 1, GRID_HEIGHT - 1));
        assert!(!is_valid_grid_position(GRID_WIDTH, 0));
        assert!(!is_valid_grid_position(0, GRID_HEIGHT));
        assert!(!is_valid_grid_position(-1, 3));
        assert!(SPAWN_POSITION.is_within_grid());
    }

    #[test]
    fn test_position_clamped() {
        assert_eq!(Position::new(-4, 99).clamped(), Position::new(0, GRID_HEIGHT - 1));
        assert_eq!(Position::new(7, 8).clamped(), Position::new(7, 8));
    }

    #[test]
    fn test_color_for_id_is_deterministic() {
        assert_eq!(color_for_id("player_1"), color_for_id("player_1"));
        assert!(PLAYER_COLORS.contains(&color_for_id("abc").as_str()));
        // 'a' + 'b' + 'c' = 294, 294 % 10 = 4
        assert_eq!(color_for_id("abc"), PLAYER_COLORS[4]);
    }

    #[test]
    fn test_color_for_long_high_code_point_id() {
        let id: String = std::iter::repeat('\u{10FFFF}').take(5000).collect();
        // 0x10FFFF * 5000 does not fit in a u32.
        let expected = (0x10FFFFu64 * 5000 % PLAYER_COLORS.len() as u64) as usize;
        assert_eq!(color_for_id(&id), PLAYER_COLORS[expected]);
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("player_123_xyz"), "Pxyz");
        assert_eq!(short_name("ab"), "Pab");
        assert_eq!(short_name(""), "P");
    }

    #[test]
    fn test_random_name_uses_word_lists() {
        let name = generate_random_name();
        assert!(NAME_PREFIXES.iter().any(|p| name.starts_with(p)));
        assert!(NAME_SUFFIXES.iter().any(|s| name.ends_with(s)));
    }

    #[test]
    fn test_random_palette_color() {
        let color = random_palette_color();
        assert!(COLOR_PALETTE.contains(&color.as_str()));
    }
}
