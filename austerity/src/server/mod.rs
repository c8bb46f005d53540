//! The hub server: listeners, lobby, game drivers, scoreboard, and the
//! SIGINT rebind / SIGTERM shutdown control loop.

mod connection;
mod driver;
mod lobby;
mod listener;
mod scores;
pub mod signals;

pub use scores::scores_csv;

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use log::{error, info, warn};

use crate::entities::Tokens;
use crate::error::ServerError;

use lobby::LobbyMatcher;

/// A finished or live player's contribution to the scoreboard.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub name: String,
    pub score: u32,
    pub tokens: Tokens,
}

impl PlayerSnapshot {
    fn of(player: &crate::entities::Player) -> Self {
        Self { name: player.name.clone(), score: player.score, tokens: player.tokens }
    }
}

/// One player's line in a reconnect catchup (spec §4.7).
#[derive(Debug, Clone)]
pub(crate) struct CatchupLine {
    pub letter: char,
    pub score: u32,
    pub discounts: [u32; crate::entities::NUM_COLOURS],
    pub tokens: Tokens,
}

/// The state a reconnect handler needs to replay to a rejoining
/// player, refreshed by the driver after every state change. A
/// separate thread may read this safely because the driver is blocked
/// in `await_reconnect` (not mutating `GameState`) whenever a
/// reconnect handler is waiting to consume it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Catchup {
    pub initial_tokens: u32,
    pub board: Vec<crate::entities::Card>,
    pub players: Vec<CatchupLine>,
}

/// Cross-thread reconnect handoff for a single game (spec §4.5).
#[derive(Default)]
struct ReconnectState {
    waiting_slot: Option<usize>,
    incoming_socket: Option<TcpStream>,
}

/// The handle other threads use to interact with a running (or
/// finished) game: its identity, player sockets, shutdown flag,
/// reconnect channel and scoreboard snapshot. `sockets[p]` is the
/// single write-and-shutdown handle for player `p`'s current
/// connection; the driver keeps its own read-side clone.
pub struct GameHandle {
    pub name: String,
    pub counter: u32,
    pub player_count: usize,
    pub finished: AtomicBool,
    sockets: Vec<Mutex<Option<TcpStream>>>,
    reconnect: Mutex<ReconnectState>,
    reconnect_cv: Condvar,
    pub snapshot: Mutex<Vec<PlayerSnapshot>>,
    catchup: Mutex<Catchup>,
    driver_thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl GameHandle {
    fn new(name: String, counter: u32, sockets: Vec<TcpStream>, snapshot: Vec<PlayerSnapshot>) -> Self {
        let player_count = sockets.len();
        Self {
            name,
            counter,
            player_count,
            finished: AtomicBool::new(false),
            sockets: sockets.into_iter().map(|s| Mutex::new(Some(s))).collect(),
            reconnect: Mutex::new(ReconnectState::default()),
            reconnect_cv: Condvar::new(),
            snapshot: Mutex::new(snapshot),
            catchup: Mutex::new(Catchup::default()),
            driver_thread: Mutex::new(None),
        }
    }

    /// Stashes the driver thread's join handle so shutdown can wait for
    /// it. Called once, right after the thread is spawned.
    fn set_driver_thread(&self, handle: std::thread::JoinHandle<()>) {
        *self.driver_thread.lock().unwrap() = Some(handle);
    }

    /// Joins the driver thread if it hasn't been joined already.
    /// Called during orderly shutdown (spec §2, §4.8) after the game
    /// has been marked finished and its sockets closed.
    fn join_driver_thread(&self) {
        if let Some(thread) = self.driver_thread.lock().unwrap().take() {
            let _ = thread.join();
        }
    }

    fn write_line(&self, p: usize, msg: &str) {
        let mut guard = self.sockets[p].lock().unwrap();
        if let Some(sock) = guard.as_mut() {
            if let Err(e) = writeln!(sock, "{msg}") {
                warn!("write to {}/{} player {p} failed: {e}", self.name, self.counter);
            }
        }
    }

    fn broadcast(&self, msg: &str) {
        for p in 0..self.player_count {
            self.write_line(p, msg);
        }
    }

    fn close_all(&self) {
        for slot in &self.sockets {
            if let Some(sock) = slot.lock().unwrap().take() {
                let _ = sock.shutdown(Shutdown::Both);
            }
        }
    }

    /// Replaces player `p`'s write handle after a reconnect, returning
    /// a read-side clone for the driver to resume blocking reads on.
    fn replace_socket(&self, p: usize, sock: TcpStream) -> std::io::Result<TcpStream> {
        let reader = sock.try_clone()?;
        *self.sockets[p].lock().unwrap() = Some(sock);
        Ok(reader)
    }

    /// Marks the game finished exactly once; the winning caller
    /// broadcasts `msg` (if any) and closes every socket. Prevents a
    /// natural game-over and a concurrent SIGTERM from both acting.
    fn finish_with(&self, msg: Option<&str>) {
        if !self.finished.swap(true, Ordering::SeqCst) {
            if let Some(m) = msg {
                self.broadcast(m);
            }
            self.close_all();
        }
        self.reconnect_cv.notify_all();
    }

    /// Called by the driver on EOF from player `p`. Blocks until either
    /// a reconnect handler hands in a new socket, the deadline passes,
    /// or the game is marked finished (e.g. by SIGTERM). `timeout ==
    /// 0` returns `None` immediately without publishing the slot.
    fn await_reconnect(&self, p: usize, timeout: Duration) -> Option<TcpStream> {
        if timeout.is_zero() {
            return None;
        }
        let deadline = std::time::Instant::now() + timeout;
        let mut state = self.reconnect.lock().unwrap();
        state.waiting_slot = Some(p);
        loop {
            if self.finished.load(Ordering::SeqCst) {
                state.waiting_slot = None;
                return None;
            }
            if let Some(sock) = state.incoming_socket.take() {
                state.waiting_slot = None;
                return Some(sock);
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                state.waiting_slot = None;
                return None;
            }
            let (guard, _) = self.reconnect_cv.wait_timeout(state, deadline - now).unwrap();
            state = guard;
        }
    }

    /// Called by a reconnect handler once it holds a parsed reconnect
    /// id for this game. Polls in bounded ticks rather than a true
    /// busy-loop (see SPEC_FULL.md's note on the original's spin wait).
    fn wait_for_slot(&self, p: usize) -> bool {
        let mut state = self.reconnect.lock().unwrap();
        loop {
            if self.finished.load(Ordering::SeqCst) {
                return false;
            }
            if state.waiting_slot == Some(p) {
                return true;
            }
            let (guard, _) = self
                .reconnect_cv
                .wait_timeout(state, Duration::from_millis(200))
                .unwrap();
            state = guard;
        }
    }

    fn hand_off_socket(&self, sock: TcpStream) {
        let mut state = self.reconnect.lock().unwrap();
        state.incoming_socket = Some(sock);
        drop(state);
        self.reconnect_cv.notify_all();
    }

    /// Refreshes both the scoreboard snapshot and the reconnect
    /// catchup cache from the driver's current `GameState`.
    fn sync_state(&self, game: &crate::game::GameState) {
        *self.snapshot.lock().unwrap() = game.players.iter().map(PlayerSnapshot::of).collect();
        *self.catchup.lock().unwrap() = Catchup {
            initial_tokens: game.initial_tokens,
            board: game.board.clone(),
            players: game
                .players
                .iter()
                .map(|p| CatchupLine { letter: p.letter(), score: p.score, discounts: p.discounts, tokens: p.tokens })
                .collect(),
        };
    }

    fn catchup_snapshot(&self) -> Catchup {
        self.catchup.lock().unwrap().clone()
    }
}

/// All games, past and present, for the lifetime of the process —
/// grown under a mutex at creation time, read lock-free by the
/// scoreboard (see spec §9 on scoreboard consistency).
#[derive(Default, Clone)]
pub struct GamesRegistry(Arc<Mutex<Vec<Arc<GameHandle>>>>);

impl GamesRegistry {
    fn find(&self, name: &str, counter: u32) -> Option<Arc<GameHandle>> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.name == name && g.counter == counter)
            .cloned()
    }

    /// Computes this name's next game counter and registers the new
    /// handle atomically, so two lobbies of the same name closing in
    /// quick succession can never be assigned the same counter.
    fn register(&self, name: &str, make: impl FnOnce(u32) -> Arc<GameHandle>) -> Arc<GameHandle> {
        let mut games = self.0.lock().unwrap();
        let counter = 1 + games.iter().filter(|g| g.name == name).count() as u32;
        let handle = make(counter);
        games.push(handle.clone());
        handle
    }

    fn snapshot_all(&self) -> Vec<PlayerSnapshot> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .flat_map(|g| g.snapshot.lock().unwrap().clone())
            .collect()
    }

    fn all(&self) -> Vec<Arc<GameHandle>> {
        self.0.lock().unwrap().clone()
    }

    #[cfg(test)]
    pub(crate) fn push_for_test(&self, name: &str, snapshot: Vec<PlayerSnapshot>) {
        let handle = Arc::new(GameHandle::new(name.to_string(), 1, Vec::new(), snapshot));
        self.0.lock().unwrap().push(handle);
    }
}

/// Everything the server needs that doesn't change across a SIGINT
/// rebind cycle: the key, the deck template, and the reconnect window.
pub struct ServerConfig {
    pub key: String,
    pub deck: Vec<crate::entities::Card>,
    pub timeout: Duration,
}

/// Runs the hub until SIGTERM (or an unrecoverable bind failure).
/// `statfile_path` is reloaded on every SIGINT rebind cycle.
pub fn run(config: ServerConfig, statfile_path: std::path::PathBuf) -> Result<(), ServerError> {
    let entries = crate::config::load_statfile(&statfile_path)?;
    let games = GamesRegistry::default();
    let lobby = Arc::new(LobbyMatcher::default());
    let shutdown = Arc::new(signals::ShutdownSignal::default());

    signals::install(shutdown.clone())?;

    let mut pool = listener::ListenerPool::bind(&entries)?;
    pool.print_resolved_ports();

    loop {
        let ctx = Arc::new(connection::ConnectionContext {
            key: config.key.clone(),
            deck: config.deck.clone(),
            timeout: config.timeout,
            games: games.clone(),
            lobby: lobby.clone(),
        });
        let acceptors = pool.spawn_acceptors(ctx);

        match shutdown.wait_for_signal() {
            signals::Signal::Rebind => {
                info!("SIGINT received: rebinding listeners");
                pool.stop_and_join(acceptors);
                let reloaded = match crate::config::load_statfile(&statfile_path) {
                    Ok(entries) => entries,
                    Err(e) => {
                        error!("failed to reload statfile during rebind: {e}");
                        continue;
                    }
                };
                pool = listener::ListenerPool::bind(&reloaded)?;
                pool.print_resolved_ports();
            }
            signals::Signal::Shutdown => {
                info!("SIGTERM received: shutting down");
                pool.stop_and_join(acceptors);
                for handle in games.all() {
                    handle.finish_with(Some("eog"));
                }
                for handle in games.all() {
                    handle.join_driver_thread();
                }
                return Ok(());
            }
        }
    }
}
