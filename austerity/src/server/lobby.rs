//! Lobby matcher (spec §4.3): maps `(gameName, listening port)` to an
//! open lobby, admitting players until the port's statfile entry is
//! satisfied, then handing the populated roster to a game driver.

use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::Mutex;

use crate::config::StatfileEntry;

struct OpenLobby {
    entry: StatfileEntry,
    players: Vec<(String, TcpStream)>,
}

/// A lobby that has reached its configured player count, ready to
/// become a `GameState` (players not yet sorted/lettered).
pub struct ReadyGame {
    pub name: String,
    pub entry: StatfileEntry,
    pub players: Vec<(String, TcpStream)>,
}

#[derive(Default)]
pub struct LobbyMatcher {
    open: Mutex<HashMap<String, OpenLobby>>,
}

impl LobbyMatcher {
    /// Admits `player_name`/`stream` into the lobby named `name`,
    /// creating it from `entry` if this is the first arrival. Returns
    /// `Some` exactly when this arrival closed the lobby. The whole
    /// lookup-or-create-and-push happens under one lock, per spec:
    /// "a single mutex serializes lobby lookup+join".
    pub fn join(&self, name: &str, entry: StatfileEntry, player_name: String, stream: TcpStream) -> Option<ReadyGame> {
        let mut open = self.open.lock().unwrap();
        let lobby = open
            .entry(name.to_string())
            .or_insert_with(|| OpenLobby { entry, players: Vec::new() });
        lobby.players.push((player_name, stream));

        if lobby.players.len() == lobby.entry.players as usize {
            let OpenLobby { entry, mut players } = open.remove(name).unwrap();
            // Name ascending, join-index ascending on ties (stable sort).
            players.sort_by(|a, b| a.0.cmp(&b.0));
            Some(ReadyGame { name: name.to_string(), entry, players })
        } else {
            None
        }
    }
}
