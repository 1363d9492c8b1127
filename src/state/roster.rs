use indexmap::IndexMap;

use crate::error::GameError;

/// Participant tracked by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Opaque identifier supplied by the transport (connection id).
    pub id: String,
    /// Name shown to other participants.
    pub name: String,
    /// Rounds won so far.
    pub score: u32,
    /// Seconds spent on the current round's puzzle; the full time frame when unsolved.
    pub time_used: u32,
    /// Whether the player already had their turn this round.
    pub has_played: bool,
}

impl Player {
    /// Fresh player with no score and a full time budget.
    pub fn new(id: String, name: String, time_frame: u32) -> Self {
        Self {
            id,
            name,
            score: 0,
            time_used: time_frame,
            has_played: false,
        }
    }

    fn reset(&mut self) {
        self.score = 0;
        self.has_played = false;
    }
}

/// Players of a session in join order, which is also the turn order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: IndexMap<String, Player>,
}

impl Roster {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody joined.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whether `id` is in the roster.
    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    /// Look up a player.
    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Position of `id` in turn order.
    pub fn find_index(&self, id: &str) -> Option<usize> {
        self.players.get_index_of(id)
    }

    /// Player at `index` in turn order.
    pub fn get_index(&self, index: usize) -> Option<&Player> {
        self.players.get_index(index).map(|(_, player)| player)
    }

    /// Players in turn order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Mutable players in turn order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Owned copy of the players in turn order.
    pub fn to_vec(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    /// Append a player, refusing duplicate identifiers.
    pub fn add(&mut self, id: String, name: String, time_frame: u32) -> Result<&Player, GameError> {
        if self.players.contains_key(&id) {
            return Err(GameError::Conflict(format!("player `{id}` already joined")));
        }
        let entry = self
            .players
            .entry(id.clone())
            .or_insert_with(|| Player::new(id, name, time_frame));
        Ok(&*entry)
    }

    /// Remove a player while preserving everyone else's order.
    pub fn remove(&mut self, id: &str) -> bool {
        self.players.shift_remove(id).is_some()
    }

    /// Zero every score and turn flag.
    pub fn reset_all(&mut self) {
        self.players.values_mut().for_each(Player::reset);
    }

    /// Give every player a full time budget and a fresh turn.
    pub fn restore_time_budget(&mut self, time_frame: u32) {
        for player in self.players.values_mut() {
            player.time_used = time_frame;
            player.has_played = false;
        }
    }

    /// Whether every player had their turn this round.
    pub fn all_played(&self) -> bool {
        self.players.values().all(|player| player.has_played)
    }

    /// Smallest time used this round.
    pub fn min_time_used(&self) -> Option<u32> {
        self.players.values().map(|player| player.time_used).min()
    }

    /// Player whose turn follows `id`, wrapping around.
    pub fn next_after(&self, id: &str) -> Option<&Player> {
        let index = self.find_index(id)?;
        self.get_index((index + 1) % self.players.len())
    }

    /// Player with the strictly highest score; the earliest joined wins ties.
    pub fn leader(&self) -> Option<&Player> {
        self.players.values().fold(None, |best: Option<&Player>, player| match best {
            Some(current) if current.score >= player.score => Some(current),
            _ => Some(player),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(ids: &[&str]) -> Roster {
        let mut roster = Roster::new();
        for id in ids {
            roster.add(id.to_string(), id.to_uppercase(), 60).unwrap();
        }
        roster
    }

    #[test]
    fn add_rejects_duplicates_without_growing() {
        let mut roster = roster(&["a", "b"]);
        let err = roster.add("a".into(), "again".into(), 60).unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)));
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get("a").unwrap().name, "A");
    }

    #[test]
    fn new_players_start_with_a_full_budget() {
        let roster = roster(&["a"]);
        let player = roster.get("a").unwrap();
        assert_eq!(player.score, 0);
        assert_eq!(player.time_used, 60);
        assert!(!player.has_played);
    }

    #[test]
    fn remove_keeps_order_and_reports_absence() {
        let mut roster = roster(&["a", "b", "c"]);
        assert!(roster.remove("b"));
        assert!(!roster.remove("b"));
        assert_eq!(roster.find_index("c"), Some(1));
    }

    #[test]
    fn next_after_wraps_around() {
        let roster = roster(&["a", "b", "c"]);
        assert_eq!(roster.next_after("a").unwrap().id, "b");
        assert_eq!(roster.next_after("c").unwrap().id, "a");
        assert!(roster.next_after("z").is_none());
    }

    #[test]
    fn reset_all_clears_scores_and_turn_flags() {
        let mut roster = roster(&["a", "b"]);
        for player in ["a", "b"] {
            let player = roster.get_mut(player).unwrap();
            player.score = 2;
            player.has_played = true;
            player.time_used = 12;
        }
        roster.reset_all();
        assert!(roster.iter().all(|p| p.score == 0 && !p.has_played));
        assert!(roster.iter().all(|p| p.time_used == 12));
    }

    #[test]
    fn leader_prefers_earliest_among_tied_maxima() {
        let mut roster = roster(&["a", "b", "c"]);
        for (id, score) in [("a", 3), ("b", 5), ("c", 5)] {
            roster.get_mut(id).unwrap().score = score;
        }
        assert_eq!(roster.leader().unwrap().id, "b");
        assert!(Roster::new().leader().is_none());
    }
}
