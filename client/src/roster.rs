//! Local view of every known player
//!
//! The roster is reconciled against server events: players are added on join,
//! moved, marked offline (never deleted) on disconnect, rebound to a new id on
//! reconnect, and replaced wholesale when a snapshot arrives. It also tracks
//! which record is the operator's own avatar and which one is highlighted.
//!
//! Reconnects correlate by display name, not by id. Two players sharing a name
//! cannot be told apart; the first record with that name is rebound.

use crate::identity::Operator;
use log::{debug, info, warn};
use shared::{
    color_for_id, is_valid_grid_position, short_name, JoinedPlayer, Position, SnapshotEntry,
    SPAWN_POSITION,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub position: Position,
    pub color: String,
    pub name: Option<String>,
    /// True iff this record belongs to the operator. Maintained by the roster.
    pub is_operator: bool,
    pub online: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, position: Position, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position,
            color: color.into(),
            name: None,
            is_operator: false,
            online: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => short_name(&self.id),
        }
    }
}

impl From<SnapshotEntry> for Player {
    fn from(entry: SnapshotEntry) -> Self {
        Self {
            id: entry.player_id,
            position: entry.position,
            color: entry.color,
            name: Some(entry.name),
            is_operator: false,
            online: entry.online,
        }
    }
}

impl From<JoinedPlayer> for Player {
    fn from(joined: JoinedPlayer) -> Self {
        Player::new(joined.player_id, joined.position, joined.color).with_name(joined.name)
    }
}

/// Partial update merged into an existing record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerUpdate {
    pub position: Option<Position>,
    pub color: Option<String>,
    pub name: Option<String>,
    pub online: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// An existing record with the same name now carries the new id.
    Rebound { previous_id: String },
    /// Nobody had that name; a fresh record was added.
    Created,
}

/// Operations the message router dispatches into.
pub trait Reconciler {
    fn add(&mut self, player: Player);
    fn update_position(&mut self, player_id: &str, x: i32, y: i32) -> bool;
    fn mark_offline(&mut self, player_id: &str) -> bool;
    fn reconnect(&mut self, new_id: &str, name: &str, color: Option<&str>) -> ReconnectOutcome;
    fn replace_all(&mut self, players: Vec<Player>);
    fn deduplicate(&mut self) -> usize;
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<Player>,
    operator: Option<Operator>,
    current_player: Option<String>,
    highlighted: Option<String>,
}

impl Roster {
    pub fn new(operator: Operator) -> Self {
        Self {
            players: Vec::new(),
            operator: Some(operator),
            current_player: None,
            highlighted: None,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn online_count(&self) -> usize {
        self.players.iter().filter(|p| p.online).count()
    }

    pub fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    /// Installs a new operator identity and re-derives everything keyed on it.
    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = Some(operator);
        self.refresh_operator_flags();
        self.sync_current_player();
    }

    pub fn is_operator(&self, player_id: &str) -> bool {
        self.operator
            .as_ref()
            .is_some_and(|operator| operator.id == player_id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.current_player.as_deref().and_then(|id| self.get(id))
    }

    pub fn set_highlighted(&mut self, player_id: Option<String>) {
        self.highlighted = player_id;
    }

    pub fn highlighted(&self) -> Option<&Player> {
        self.highlighted.as_deref().and_then(|id| self.get(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.display_name() == name)
    }

    pub fn add(&mut self, mut player: Player) {
        if !player.position.is_within_grid() {
            warn!(
                "Player {} added outside the grid at ({}, {}), clamping",
                player.id, player.position.x, player.position.y
            );
            player.position = player.position.clamped();
        }

        player.is_operator = self.is_operator(&player.id);
        if player.is_operator {
            self.current_player = Some(player.id.clone());
        }

        debug!("Adding player {} ({})", player.id, player.display_name());
        self.players.push(player);
    }

    /// Merges `update` into every record with `player_id`. Returns false when
    /// no such record exists.
    pub fn update_fields(&mut self, player_id: &str, update: PlayerUpdate) -> bool {
        let position = match update.position {
            Some(position) if !position.is_within_grid() => {
                warn!(
                    "Ignoring out-of-grid position ({}, {}) for {}",
                    position.x, position.y, player_id
                );
                None
            }
            other => other,
        };

        let mut touched = false;
        for player in self.players.iter_mut().filter(|p| p.id == player_id) {
            if let Some(position) = position {
                player.position = position;
            }
            if let Some(color) = &update.color {
                player.color = color.clone();
            }
            if let Some(name) = &update.name {
                player.name = Some(name.clone());
            }
            if let Some(online) = update.online {
                player.online = online;
            }
            touched = true;
        }

        if touched && self.is_operator(player_id) {
            self.current_player = Some(player_id.to_string());
        }
        touched
    }

    pub fn update_position(&mut self, player_id: &str, x: i32, y: i32) -> bool {
        if !is_valid_grid_position(x, y) {
            warn!("Rejected move of {} to ({}, {}): outside grid", player_id, x, y);
            return false;
        }

        self.update_fields(
            player_id,
            PlayerUpdate {
                position: Some(Position::new(x, y)),
                ..PlayerUpdate::default()
            },
        )
    }

    /// Flags the player offline. The record stays in the roster.
    pub fn mark_offline(&mut self, player_id: &str) -> bool {
        let mut touched = false;
        for player in self.players.iter_mut().filter(|p| p.id == player_id) {
            player.online = false;
            touched = true;
        }

        // The operator's own avatar counts as unplaced after their disconnect.
        if self.is_operator(player_id) {
            self.current_player = None;
        }

        if touched {
            info!("Player {} went offline", player_id);
        }
        touched
    }

    pub fn reconnect(&mut self, new_id: &str, name: &str, color: Option<&str>) -> ReconnectOutcome {
        let color = color.filter(|c| !c.is_empty());

        let Some(index) = self.players.iter().position(|p| p.display_name() == name) else {
            info!("No player named {}, creating {}", name, new_id);
            let color = color
                .map(str::to_string)
                .unwrap_or_else(|| color_for_id(new_id));
            self.add(Player::new(new_id, SPAWN_POSITION, color).with_name(name));
            return ReconnectOutcome::Created;
        };

        let previous_id = self.players[index].id.clone();
        let was_current = self.current_player.as_deref() == Some(previous_id.as_str());

        let player = &mut self.players[index];
        player.id = new_id.to_string();
        if let Some(color) = color {
            player.color = color.to_string();
        }
        player.online = true;

        if was_current {
            if let Some(operator) = self.operator.as_mut() {
                operator.id = new_id.to_string();
                if let Some(color) = color {
                    operator.color = color.to_string();
                }
            }
            self.current_player = Some(new_id.to_string());
        }
        self.refresh_operator_flags();

        info!("Player {} reconnected: {} -> {}", name, previous_id, new_id);
        ReconnectOutcome::Rebound { previous_id }
    }

    /// Swaps in a full snapshot. The current-player pointer is looked up
    /// afresh in the new set.
    pub fn replace_all(&mut self, players: Vec<Player>) {
        self.players = players;
        for player in &mut self.players {
            if !player.position.is_within_grid() {
                warn!("Snapshot placed {} outside the grid, clamping", player.id);
                player.position = player.position.clamped();
            }
        }
        self.refresh_operator_flags();
        self.sync_current_player();
        info!("Roster replaced with {} players", self.players.len());
    }

    /// Keeps one record per display name: online beats offline, then the
    /// greatest id wins. Returns how many records were dropped.
    pub fn deduplicate(&mut self) -> usize {
        let mut survivors: HashMap<String, usize> = HashMap::new();

        for (index, player) in self.players.iter().enumerate() {
            let key = player.display_name();
            let replace = match survivors.get(&key) {
                Some(&kept) => supersedes(player, &self.players[kept]),
                None => true,
            };
            if replace {
                survivors.insert(key, index);
            }
        }

        let kept: HashSet<usize> = survivors.into_values().collect();
        let before = self.players.len();
        let mut index = 0;
        self.players.retain(|_| {
            let keep = kept.contains(&index);
            index += 1;
            keep
        });

        let removed = before - self.players.len();
        if removed > 0 {
            info!("Removed {} duplicate players", removed);
            let operator_id = self.operator.as_ref().map(|o| o.id.clone());
            if let Some(operator_id) = operator_id {
                if self.get(&operator_id).is_some() {
                    self.current_player = Some(operator_id);
                }
            }
        }
        removed
    }

    pub fn players_at(&self, x: i32, y: i32) -> Vec<&Player> {
        self.players
            .iter()
            .filter(|p| p.position.x == x && p.position.y == y)
            .collect()
    }

    /// Re-derives the current-player pointer from the roster contents.
    pub fn sync_current_player(&mut self) {
        self.current_player = self
            .operator
            .as_ref()
            .filter(|operator| self.players.iter().any(|p| p.id == operator.id))
            .map(|operator| operator.id.clone());
    }

    /// Local-only purge: forgets the operator and every known player.
    pub fn purge(&mut self) {
        self.operator = None;
        self.players.clear();
        self.current_player = None;
        self.highlighted = None;
        info!("Roster purged");
    }

    fn refresh_operator_flags(&mut self) {
        let operator_id = self.operator.as_ref().map(|o| o.id.as_str());
        for player in &mut self.players {
            player.is_operator = operator_id == Some(player.id.as_str());
        }
    }
}

fn supersedes(candidate: &Player, existing: &Player) -> bool {
    if candidate.online != existing.online {
        candidate.online
    } else {
        candidate.id > existing.id
    }
}

impl Reconciler for Roster {
    fn add(&mut self, player: Player) {
        Roster::add(self, player)
    }

    fn update_position(&mut self, player_id: &str, x: i32, y: i32) -> bool {
        Roster::update_position(self, player_id, x, y)
    }

    fn mark_offline(&mut self, player_id: &str) -> bool {
        Roster::mark_offline(self, player_id)
    }

    fn reconnect(&mut self, new_id: &str, name: &str, color: Option<&str>) -> ReconnectOutcome {
        Roster::reconnect(self, new_id, name, color)
    }

    fn replace_all(&mut self, players: Vec<Player>) {
        Roster::replace_all(self, players)
    }

    fn deduplicate(&mut self) -> usize {
        Roster::deduplicate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{GRID_HEIGHT, GRID_WIDTH};

    fn operator() -> Operator {
        Operator::new("me", "#3B82F6", "Fox")
    }

    fn roster_with(players: Vec<Player>) -> Roster {
        let mut roster = Roster::new(operator());
        for player in players {
            roster.add(player);
        }
        roster
    }

    fn snapshot(roster: &Roster) -> Vec<(String, String, bool, Position)> {
        roster
            .players()
            .iter()
            .map(|p| (p.id.clone(), p.display_name(), p.online, p.position))
            .collect()
    }

    #[test]
    fn test_add_operator_sets_current_player() {
        let mut roster = Roster::new(operator());
        let player = Player::new("me", Position::new(1, 1), "#fff").with_name("Fox");
        roster.add(player.clone());

        let current = roster.current_player().unwrap();
        assert_eq!(current.id, "me");
        assert!(current.is_operator);
    }

    #[test]
    fn test_add_other_player_leaves_pointer_alone() {
        let mut roster = Roster::new(operator());
        roster.add(Player::new("p1", Position::new(1, 1), "#fff"));
        assert!(roster.current_player().is_none());
        assert!(!roster.players()[0].is_operator);
    }

    #[test]
    fn test_add_allows_duplicate_ids() {
        let mut roster = Roster::new(operator());
        roster.add(Player::new("p1", Position::new(1, 1), "#fff"));
        roster.add(Player::new("p1", Position::new(2, 2), "#000"));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_add_clamps_out_of_grid_position() {
        let mut roster = Roster::new(operator());
        roster.add(Player::new("p1", Position::new(99, -3), "#fff"));
        assert_eq!(roster.players()[0].position, Position::new(GRID_WIDTH - 1, 0));
    }

    #[test]
    fn test_update_fields_merges_and_ignores_unknown() {
        let mut roster = roster_with(vec![Player::new("p1", Position::new(1, 1), "#fff")]);

        assert!(roster.update_fields(
            "p1",
            PlayerUpdate {
                color: Some("#000".to_string()),
                name: Some("Owl".to_string()),
                ..PlayerUpdate::default()
            },
        ));
        let player = roster.get("p1").unwrap();
        assert_eq!(player.color, "#000");
        assert_eq!(player.display_name(), "Owl");
        assert_eq!(player.position, Position::new(1, 1));

        let before = snapshot(&roster);
        assert!(!roster.update_fields("ghost", PlayerUpdate::default()));
        assert_eq!(snapshot(&roster), before);
    }

    #[test]
    fn test_update_fields_refreshes_current_player() {
        let mut roster = roster_with(vec![Player::new("me", Position::new(1, 1), "#fff")]);
        roster.mark_offline("me");
        assert!(roster.current_player().is_none());

        roster.update_fields(
            "me",
            PlayerUpdate {
                online: Some(true),
                ..PlayerUpdate::default()
            },
        );
        assert_eq!(roster.current_player().unwrap().id, "me");
    }

    #[test]
    fn test_update_position_bounds_rejection() {
        let mut roster = roster_with(vec![Player::new("p1", Position::new(3, 3), "#fff")]);

        for (x, y) in [(GRID_WIDTH, 0), (-1, 0), (0, GRID_HEIGHT), (0, -1)] {
            assert!(!roster.update_position("p1", x, y));
            assert_eq!(roster.get("p1").unwrap().position, Position::new(3, 3));
        }

        assert!(roster.update_position("p1", GRID_WIDTH - 1, GRID_HEIGHT - 1));
        assert_eq!(
            roster.get("p1").unwrap().position,
            Position::new(GRID_WIDTH - 1, GRID_HEIGHT - 1)
        );
    }

    #[test]
    fn test_update_position_unknown_player_is_noop() {
        let mut roster = Roster::new(operator());
        assert!(!roster.update_position("ghost", 1, 1));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_mark_offline_never_deletes() {
        let mut roster = roster_with(vec![
            Player::new("p1", Position::new(1, 1), "#fff"),
            Player::new("p2", Position::new(2, 2), "#fff"),
            Player::new("me", Position::new(3, 3), "#fff"),
        ]);
        let ids: Vec<String> = roster.players().iter().map(|p| p.id.clone()).collect();

        for id in &ids {
            roster.mark_offline(id);
        }

        for id in &ids {
            let player = roster.get(id).unwrap();
            assert!(!player.online);
        }
        assert_eq!(roster.len(), 3);
        assert_eq!(roster.online_count(), 0);
    }

    #[test]
    fn test_mark_offline_operator_clears_current_player() {
        let mut roster = roster_with(vec![
            Player::new("me", Position::new(1, 1), "#fff"),
            Player::new("p1", Position::new(2, 2), "#fff"),
        ]);

        roster.mark_offline("p1");
        assert_eq!(roster.current_player().unwrap().id, "me");

        roster.mark_offline("me");
        assert!(roster.current_player().is_none());
        assert!(roster.get("me").is_some());
    }

    #[test]
    fn test_reconnect_matches_by_name() {
        let mut roster =
            roster_with(vec![Player::new("p1", Position::new(4, 4), "#000")
                .with_name("Fox")
                .offline()]);

        let outcome = roster.reconnect("p2", "Fox", Some("#fff"));

        assert_eq!(
            outcome,
            ReconnectOutcome::Rebound {
                previous_id: "p1".to_string()
            }
        );
        assert_eq!(roster.len(), 1);
        assert!(roster.get("p1").is_none());
        let player = roster.get("p2").unwrap();
        assert_eq!(player.display_name(), "Fox");
        assert_eq!(player.color, "#fff");
        assert_eq!(player.position, Position::new(4, 4));
        assert!(player.online);
    }

    #[test]
    fn test_reconnect_keeps_color_when_none_given() {
        let mut roster = roster_with(vec![Player::new("p1", Position::new(4, 4), "#000")
            .with_name("Fox")
            .offline()]);
        roster.reconnect("p2", "Fox", Some(""));
        assert_eq!(roster.get("p2").unwrap().color, "#000");
    }

    #[test]
    fn test_reconnect_without_match_creates_player() {
        let mut roster = roster_with(vec![Player::new("p1", Position::new(4, 4), "#000")
            .with_name("Fox")
            .offline()]);

        let outcome = roster.reconnect("p9", "Ghost", None);

        assert_eq!(outcome, ReconnectOutcome::Created);
        assert_eq!(roster.len(), 2);
        let fox = roster.get("p1").unwrap();
        assert!(!fox.online);
        assert_eq!(fox.display_name(), "Fox");
        let ghost = roster.get("p9").unwrap();
        assert!(ghost.online);
        assert_eq!(ghost.display_name(), "Ghost");
        assert_eq!(ghost.position, SPAWN_POSITION);
        assert_eq!(ghost.color, color_for_id("p9"));
    }

    #[test]
    fn test_reconnect_of_current_player_rebinds_operator() {
        let mut roster = roster_with(vec![Player::new("me", Position::new(1, 1), "#000")
            .with_name("Fox")]);

        roster.reconnect("me2", "Fox", Some("#fff"));

        let operator = roster.operator().unwrap();
        assert_eq!(operator.id, "me2");
        assert_eq!(operator.color, "#fff");
        let current = roster.current_player().unwrap();
        assert_eq!(current.id, "me2");
        assert!(current.is_operator);
        assert!(roster.is_operator("me2"));
        assert!(!roster.is_operator("me"));
    }

    #[test]
    fn test_reconnect_of_other_player_keeps_operator() {
        let mut roster = roster_with(vec![
            Player::new("me", Position::new(1, 1), "#000").with_name("Fox"),
            Player::new("p1", Position::new(2, 2), "#000").with_name("Owl").offline(),
        ]);

        roster.reconnect("p2", "Owl", None);

        assert_eq!(roster.operator().unwrap().id, "me");
        assert_eq!(roster.current_player().unwrap().id, "me");
    }

    #[test]
    fn test_replace_all_recomputes_current_player() {
        let mut roster = roster_with(vec![Player::new("p1", Position::new(1, 1), "#000")]);
        assert!(roster.current_player().is_none());

        roster.replace_all(vec![
            Player::new("me", Position::new(5, 5), "#000").with_name("Fox"),
            Player::new("p2", Position::new(6, 6), "#000"),
        ]);
        let current = roster.current_player().unwrap();
        assert_eq!(current.id, "me");
        assert!(current.is_operator);
        assert!(roster.get("p1").is_none());

        roster.replace_all(vec![Player::new("p3", Position::new(6, 6), "#000")]);
        assert!(roster.current_player().is_none());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_deduplicate_prefers_online_then_greatest_id() {
        let mut roster = roster_with(vec![
            Player::new("p3", Position::new(1, 1), "#000").with_name("Fox").offline(),
            Player::new("p1", Position::new(2, 2), "#000").with_name("Fox"),
            Player::new("p2", Position::new(3, 3), "#000").with_name("Fox"),
            Player::new("a", Position::new(4, 4), "#000").with_name("Owl").offline(),
            Player::new("b", Position::new(5, 5), "#000").with_name("Owl").offline(),
            Player::new("solo", Position::new(6, 6), "#000").with_name("Cat"),
        ]);

        assert_eq!(roster.deduplicate(), 3);

        let ids: Vec<&str> = roster.players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "b", "solo"]);
    }

    #[test]
    fn test_deduplicate_is_idempotent() {
        let mut roster = roster_with(vec![
            Player::new("p1", Position::new(1, 1), "#000").with_name("Fox").offline(),
            Player::new("p2", Position::new(2, 2), "#000").with_name("Fox").offline(),
            Player::new("p3", Position::new(3, 3), "#000"),
            Player::new("x3", Position::new(3, 3), "#000"),
            Player::new("me", Position::new(4, 4), "#000").with_name("Owl"),
            Player::new("p4", Position::new(4, 4), "#000").with_name("Owl"),
        ]);

        roster.deduplicate();
        let once = snapshot(&roster);
        let current_once = roster.current_player().map(|p| p.id.clone());

        assert_eq!(roster.deduplicate(), 0);
        assert_eq!(snapshot(&roster), once);
        assert_eq!(roster.current_player().map(|p| p.id.clone()), current_once);
    }

    #[test]
    fn test_deduplicate_restores_pointer_to_surviving_operator() {
        let mut roster = roster_with(vec![
            Player::new("me", Position::new(1, 1), "#000").with_name("Fox"),
            Player::new("a", Position::new(2, 2), "#000").with_name("Fox").offline(),
        ]);
        roster.current_player = None;

        roster.deduplicate();
        assert_eq!(roster.current_player().unwrap().id, "me");
    }

    #[test]
    fn test_players_at() {
        let roster = roster_with(vec![
            Player::new("p1", Position::new(2, 2), "#000"),
            Player::new("p2", Position::new(2, 2), "#000"),
            Player::new("p3", Position::new(3, 2), "#000"),
        ]);

        let mut ids: Vec<&str> = roster.players_at(2, 2).iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert!(roster.players_at(9, 9).is_empty());
    }

    #[test]
    fn test_is_operator() {
        let roster = Roster::new(operator());
        assert!(roster.is_operator("me"));
        assert!(!roster.is_operator("p1"));
        assert!(!Roster::default().is_operator("me"));
    }

    #[test]
    fn test_set_operator_recomputes_flags() {
        let mut roster = roster_with(vec![
            Player::new("me", Position::new(1, 1), "#000"),
            Player::new("p1", Position::new(2, 2), "#000"),
        ]);

        roster.set_operator(Operator::new("p1", "#fff", "Owl"));

        assert!(!roster.get("me").unwrap().is_operator);
        assert!(roster.get("p1").unwrap().is_operator);
        assert_eq!(roster.current_player().unwrap().id, "p1");
    }

    #[test]
    fn test_highlight_and_purge() {
        let mut roster = roster_with(vec![Player::new("me", Position::new(1, 1), "#000")]);
        roster.set_highlighted(Some("me".to_string()));
        assert_eq!(roster.highlighted().unwrap().id, "me");

        roster.purge();
        assert!(roster.is_empty());
        assert!(roster.operator().is_none());
        assert!(roster.current_player().is_none());
        assert!(roster.highlighted().is_none());
    }
}
