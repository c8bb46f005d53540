//! Listener pool and acceptors (spec §4.6). One listening socket per
//! statfile entry, one acceptor thread per listener, one detached
//! handler thread per accepted connection.
//!
//! `std::net::TcpListener` has no `shutdown()` (unlike `TcpStream`), so
//! an acceptor blocked in `accept` is unblocked by connecting to its
//! own port; the acceptor then observes its `stopping` flag and exits
//! instead of spawning a handler for that connection.

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, warn};

use crate::config::StatfileEntry;
use crate::error::ServerError;

use super::connection::{self, ConnectionContext};

struct BoundListener {
    listener: TcpListener,
    entry: StatfileEntry,
    stopping: Arc<AtomicBool>,
}

pub struct ListenerPool {
    listeners: Vec<BoundListener>,
}

pub struct AcceptorHandle(JoinHandle<()>);

impl ListenerPool {
    /// Binds every entry's port on `127.0.0.1`. On any failure, the
    /// already-opened listeners are dropped (closing them) and startup
    /// fails, per spec §4.6.
    pub fn bind(entries: &[StatfileEntry]) -> Result<Self, ServerError> {
        let mut listeners = Vec::with_capacity(entries.len());
        for entry in entries {
            let listener = TcpListener::bind(("127.0.0.1", entry.port)).map_err(|e| {
                error!("failed to bind port {}: {e}", entry.port);
                ServerError::FailedListen
            })?;
            let resolved_port = listener.local_addr().map(|a| a.port()).unwrap_or(entry.port);
            listeners.push(BoundListener {
                listener,
                entry: StatfileEntry { port: resolved_port, ..*entry },
                stopping: Arc::new(AtomicBool::new(false)),
            });
        }
        Ok(Self { listeners })
    }

    /// Emits resolved port numbers on stderr as one space-separated
    /// line, in statfile order (spec §4.6).
    pub fn print_resolved_ports(&self) {
        let ports: Vec<String> = self.listeners.iter().map(|b| b.entry.port.to_string()).collect();
        eprintln!("{}", ports.join(" "));
    }

    pub fn spawn_acceptors(&self, ctx: Arc<ConnectionContext>) -> Vec<AcceptorHandle> {
        self.listeners
            .iter()
            .map(|bound| {
                let listener = bound.listener.try_clone().expect("clone listener socket");
                let entry = bound.entry;
                let stopping = bound.stopping.clone();
                let ctx = ctx.clone();
                let thread = thread::spawn(move || {
                    for conn in listener.incoming() {
                        if stopping.load(Ordering::SeqCst) {
                            break;
                        }
                        match conn {
                            Ok(stream) => {
                                let ctx = ctx.clone();
                                thread::spawn(move || connection::handle(stream, ctx, entry));
                            }
                            Err(e) => warn!("accept error on port {}: {e}", entry.port),
                        }
                    }
                });
                AcceptorHandle(thread)
            })
            .collect()
    }

    /// Interrupts every acceptor's blocked `accept` and joins them.
    pub fn stop_and_join(&self, acceptors: Vec<AcceptorHandle>) {
        for bound in &self.listeners {
            bound.stopping.store(true, Ordering::SeqCst);
            let _ = TcpStream::connect(("127.0.0.1", bound.entry.port));
        }
        for acceptor in acceptors {
            let _ = acceptor.0.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatfileEntry;

    #[test]
    fn port_zero_resolves_to_a_nonzero_ephemeral_port() {
        let entries = vec![StatfileEntry { port: 0, tokens: 2, points: 1, players: 2 }];
        let pool = ListenerPool::bind(&entries).unwrap();
        assert_ne!(pool.listeners[0].entry.port, 0);
    }

    #[test]
    fn bind_failure_closes_already_opened_listeners() {
        let first = vec![StatfileEntry { port: 0, tokens: 2, points: 1, players: 2 }];
        let pool = ListenerPool::bind(&first).unwrap();
        let taken_port = pool.listeners[0].entry.port;

        let entries = vec![
            StatfileEntry { port: 0, tokens: 2, points: 1, players: 2 },
            StatfileEntry { port: taken_port, tokens: 2, points: 1, players: 2 },
        ];
        assert!(ListenerPool::bind(&entries).is_err());
    }
}
