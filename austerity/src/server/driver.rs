//! Game driver (spec §4.4, §4.5): owns one game's state and its
//! players' sockets for the game's lifetime, runs the turn loop,
//! enforces the two-strike rule, and waits out disconnects.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::net::TcpStream;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::warn;

use crate::entities::{Card, Player, Tokens};
use crate::game::GameState;
use crate::protocol::{CardDescriptor, FromPlayer, ToPlayer, TokenSet};

use super::{GameHandle, GamesRegistry, PlayerSnapshot};

fn tokens_from(t: TokenSet) -> Tokens {
    Tokens { colours: t.colours, wild: t.wild }
}

enum TurnOutcome {
    Applied,
    Ended,
}

struct Driver {
    handle: Arc<GameHandle>,
    game: GameState,
    readers: Vec<BufReader<TcpStream>>,
    timeout: Duration,
}

/// Spawns the driver thread for a just-closed lobby. Returns the
/// handle other threads (reconnect, scoreboard, shutdown) use to talk
/// to this game going forward.
pub fn spawn(
    name: String,
    players: Vec<(String, TcpStream)>,
    deck: VecDeque<Card>,
    initial_tokens: u32,
    win_score: u32,
    timeout: Duration,
    games: GamesRegistry,
) -> std::io::Result<Arc<GameHandle>> {
    let mut game_players = Vec::with_capacity(players.len());
    let mut sockets = Vec::with_capacity(players.len());
    let mut readers = Vec::with_capacity(players.len());
    for (id, (pname, stream)) in players.into_iter().enumerate() {
        let reader = stream.try_clone()?;
        game_players.push(Player::new(id, pname));
        sockets.push(stream);
        readers.push(BufReader::new(reader));
    }

    let snapshot: Vec<_> = game_players.iter().map(PlayerSnapshot::of).collect();
    let name_for_game = name.clone();
    let name_for_handle = name.clone();
    let handle = games.register(&name, move |counter| {
        Arc::new(GameHandle::new(name_for_handle, counter, sockets, snapshot))
    });

    let game = GameState::new(name_for_game, handle.counter, game_players, deck, initial_tokens, win_score);
    let mut driver = Driver { handle: handle.clone(), game, readers, timeout };
    let thread_handle = handle.clone();
    let join_handle = thread::spawn(move || driver.run());
    thread_handle.set_driver_thread(join_handle);
    Ok(handle)
}

impl Driver {
    fn run(&mut self) {
        self.startup();
        self.turn_loop();
    }

    fn startup(&mut self) {
        let n = self.game.players.len();
        for p in 0..n {
            let letter = self.game.player(p).letter();
            self.handle
                .write_line(p, &ToPlayer::Rid { name: self.game.name.clone(), counter: self.game.counter, id: p }.to_string());
            self.handle.write_line(p, &ToPlayer::PlayInfo { letter, count: n }.to_string());
            self.handle
                .write_line(p, &ToPlayer::Tokens { initial: self.game.initial_tokens }.to_string());
        }
        while let Some(card) = self.game.draw_card() {
            self.handle.broadcast(&ToPlayer::NewCard(CardDescriptor::of(&card)).to_string());
        }
        self.handle.sync_state(&self.game);
    }

    fn turn_loop(&mut self) {
        let n = self.game.players.len();
        loop {
            for p in 0..n {
                if self.handle.finished.load(Ordering::SeqCst) {
                    return;
                }
                if self.game.board_empty() {
                    self.handle.finish_with(Some(&ToPlayer::Eog.to_string()));
                    return;
                }
                if let TurnOutcome::Ended = self.run_one_turn(p) {
                    return;
                }
            }
            if self.game.any_player_has_won() {
                self.handle.finish_with(Some(&ToPlayer::Eog.to_string()));
                return;
            }
        }
    }

    fn run_one_turn(&mut self, p: usize) -> TurnOutcome {
        let mut strikes = 0u8;
        loop {
            self.handle.write_line(p, &ToPlayer::DoWhat.to_string());
            let Some(line) = self.read_line(p) else {
                if !self.handle_disconnect(p) {
                    return TurnOutcome::Ended;
                }
                // Reconnected: back to the zero-strike awaiting-move state,
                // re-issue dowhat to the new socket (step 2).
                strikes = 0;
                continue;
            };

            if self.classify_and_validate(p, &line) {
                return TurnOutcome::Applied;
            }

            strikes += 1;
            if strikes >= 2 {
                let letter = self.game.player(p).letter();
                self.handle.finish_with(Some(&ToPlayer::Invalid { letter }.to_string()));
                return TurnOutcome::Ended;
            }
        }
    }

    /// Waits out player `p`'s disconnect and swaps in the reconnected
    /// socket. Returns whether the game should continue.
    fn handle_disconnect(&mut self, p: usize) -> bool {
        match self.handle.await_reconnect(p, self.timeout) {
            Some(new_sock) => match self.handle.replace_socket(p, new_sock) {
                Ok(reader) => {
                    self.readers[p] = BufReader::new(reader);
                    true
                }
                Err(e) => {
                    warn!("failed to adopt reconnect socket for player {p}: {e}");
                    let letter = self.game.player(p).letter();
                    self.handle.finish_with(Some(&ToPlayer::Disco { letter }.to_string()));
                    false
                }
            },
            None => {
                let letter = self.game.player(p).letter();
                self.handle.finish_with(Some(&ToPlayer::Disco { letter }.to_string()));
                false
            }
        }
    }

    fn read_line(&mut self, p: usize) -> Option<String> {
        let mut buf = String::new();
        match self.readers[p].read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf.strip_suffix('\n').unwrap_or(&buf).to_string()),
            Err(e) => {
                warn!("read error from player {p}: {e}");
                None
            }
        }
    }

    /// Parses and validates one line from player `p`; applies and
    /// broadcasts it if legal. Returns whether it was accepted.
    fn classify_and_validate(&mut self, p: usize, line: &str) -> bool {
        let Ok(msg) = FromPlayer::parse(line) else {
            return false;
        };

        let applied = match msg {
            FromPlayer::Wild => {
                self.game.apply_wild(p);
                let letter = self.game.player(p).letter();
                self.handle.broadcast(&ToPlayer::Wild { letter }.to_string());
                true
            }
            FromPlayer::Take(take) => {
                if !self.game.is_valid_take(take) {
                    false
                } else {
                    self.game.apply_take(p, take);
                    let letter = self.game.player(p).letter();
                    self.handle.broadcast(&ToPlayer::Took { letter, take }.to_string());
                    true
                }
            }
            FromPlayer::Purchase { index, spend } => {
                let spend_tokens = tokens_from(spend);
                if !self.game.is_valid_purchase(p, index, &spend_tokens) {
                    false
                } else {
                    let (_, refill) = self.game.apply_purchase(p, index, &spend_tokens);
                    let letter = self.game.player(p).letter();
                    self.handle.broadcast(&ToPlayer::Purchased { letter, index, spend }.to_string());
                    if let Some(card) = refill {
                        self.handle.broadcast(&ToPlayer::NewCard(CardDescriptor::of(&card)).to_string());
                    }
                    true
                }
            }
        };

        if applied {
            self.handle.sync_state(&self.game);
        }
        applied
    }
}
