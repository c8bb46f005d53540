//! Scoreboard aggregator (spec §4.7 SCORES, §9 on consistency).
//! Walks every past and present game's snapshot and aggregates
//! per-name totals into the CSV the `gopher` client expects.

use std::collections::HashMap;

use super::GamesRegistry;

/// Emits `Player Name,Total Tokens,Total Points\n` followed by one
/// line per distinct player name across every game instance, sorted
/// by total points descending, then total tokens ascending.
pub fn scores_csv(games: &GamesRegistry) -> String {
    let mut totals: HashMap<String, (u32, u32)> = HashMap::new();
    for snap in games.snapshot_all() {
        let entry = totals.entry(snap.name).or_insert((0, 0));
        entry.0 += snap.tokens.total();
        entry.1 += snap.score;
    }

    let mut rows: Vec<(String, u32, u32)> = totals.into_iter().map(|(name, (tokens, points))| (name, tokens, points)).collect();
    rows.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

    let mut out = String::from("Player Name,Total Tokens,Total Points\n");
    for (name, tokens, points) in rows {
        out.push_str(&format!("{name},{tokens},{points}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Tokens;
    use crate::server::PlayerSnapshot;

    fn push_game(games: &GamesRegistry, players: Vec<(&str, u32, u32)>) {
        let snapshot: Vec<PlayerSnapshot> = players
            .into_iter()
            .map(|(name, score, tokens)| PlayerSnapshot {
                name: name.to_string(),
                score,
                tokens: Tokens { colours: [tokens, 0, 0, 0], wild: 0 },
            })
            .collect();
        games.push_for_test("game", snapshot);
    }

    #[test]
    fn aggregates_and_sorts_points_desc_tokens_asc() {
        let games = GamesRegistry::default();
        push_game(&games, vec![("alice", 5, 2), ("bob", 3, 1)]);
        push_game(&games, vec![("alice", 2, 0), ("carol", 4, 3)]);

        let csv = scores_csv(&games);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Player Name,Total Tokens,Total Points");
        assert_eq!(lines[1], "alice,2,7");
        assert_eq!(lines[2], "carol,3,4");
        assert_eq!(lines[3], "bob,1,3");
    }

    #[test]
    fn empty_registry_emits_header_only() {
        let games = GamesRegistry::default();
        assert_eq!(scores_csv(&games), "Player Name,Total Tokens,Total Points\n");
    }
}
