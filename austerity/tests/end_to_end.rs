//! End-to-end scenarios from spec §8, driven over real `TcpStream`
//! connections against `austerity::server::run` bound to literal
//! ports (chosen distinct per test so they can run concurrently).

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use austerity::entities::{Card, Colour};
use austerity::server::{self, ServerConfig};

fn write_statfile(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

/// Starts a server bound to `port` in a background thread and leaves
/// it running; the thread is never joined; it dies with the test
/// process.
fn start_server(port: u16, key: &str, deck: Vec<Card>, players: u8, tokens: u32, points: u32, timeout: Duration) {
    let statfile = write_statfile(&format!("{port},{tokens},{points},{players}"));
    let config = ServerConfig { key: key.to_string(), deck, timeout };
    let path = statfile.path().to_path_buf();
    thread::spawn(move || {
        let _keep_statfile_alive = statfile;
        let _ = server::run(config, path);
    });
}

fn connect(port: u16) -> TcpStream {
    for _ in 0..100 {
        if let Ok(s) = TcpStream::connect(("127.0.0.1", port)) {
            return s;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("could not connect to 127.0.0.1:{port}");
}

struct Client {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    fn connect(port: u16) -> Self {
        let stream = connect(port);
        let writer = stream.try_clone().unwrap();
        Self { writer, reader: BufReader::new(stream) }
    }

    fn send(&mut self, line: &str) {
        writeln!(self.writer, "{line}").unwrap();
    }

    fn recv(&mut self) -> String {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).unwrap();
        assert!(n > 0, "connection closed unexpectedly");
        buf.trim_end_matches('\n').to_string()
    }

    fn recv_opt(&mut self) -> Option<String> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).unwrap_or(0);
        if n == 0 {
            None
        } else {
            Some(buf.trim_end_matches('\n').to_string())
        }
    }
}

fn minimal_deck() -> Vec<Card> {
    vec![
        Card { discount: Colour::Purple, value: 1, price: [1, 0, 0, 0] },
        Card { discount: Colour::Brown, value: 0, price: [0, 1, 0, 0] },
    ]
}

/// Scenario 1: two-player minimal game, spec §8.
#[test]
fn two_player_minimal_game_reaches_eog() {
    let port = 19201;
    start_server(port, "k1", minimal_deck(), 2, 2, 1, Duration::from_secs(5));

    let mut x = Client::connect(port);
    x.send("playk1");
    assert_eq!(x.recv(), "yes");
    x.send("game1");
    x.send("X");

    let mut y = Client::connect(port);
    y.send("playk1");
    assert_eq!(y.recv(), "yes");
    y.send("game1");
    y.send("Y");

    for expect in ["ridgame1,1,0", "playinfoA/2", "tokens2", "newcardP:1:1,0,0,0", "newcardB:0:0,1,0,0"] {
        assert_eq!(x.recv(), expect);
    }
    for expect in ["ridgame1,1,1", "playinfoB/2", "tokens2", "newcardP:1:1,0,0,0", "newcardB:0:0,1,0,0"] {
        assert_eq!(y.recv(), expect);
    }

    assert_eq!(x.recv(), "dowhat");
    x.send("take1,1,1,0");
    assert_eq!(x.recv(), "tookA:1,1,1,0");
    assert_eq!(y.recv(), "tookA:1,1,1,0");

    assert_eq!(y.recv(), "dowhat");
    y.send("take1,1,0,1");
    assert_eq!(x.recv(), "tookB:1,1,0,1");
    assert_eq!(y.recv(), "tookB:1,1,0,1");

    assert_eq!(x.recv(), "dowhat");
    x.send("purchase0:1,0,0,0,0");
    assert_eq!(x.recv(), "purchasedA:0:1,0,0,0,0");
    assert_eq!(y.recv(), "purchasedA:0:1,0,0,0,0");

    assert_eq!(y.recv(), "dowhat");
    y.send("wild");
    assert_eq!(x.recv(), "wildB");
    assert_eq!(y.recv(), "wildB");

    assert_eq!(x.recv(), "eog");
    assert_eq!(y.recv(), "eog");
    assert!(x.recv_opt().is_none());
    assert!(y.recv_opt().is_none());
}

/// Scenario 2: two-strike termination, spec §8.
#[test]
fn two_strikes_terminates_game() {
    let port = 19202;
    start_server(port, "k2", minimal_deck(), 2, 2, 1, Duration::from_secs(5));

    let mut x = Client::connect(port);
    x.send("playk2");
    assert_eq!(x.recv(), "yes");
    x.send("game2");
    x.send("X");

    let mut y = Client::connect(port);
    y.send("playk2");
    assert_eq!(y.recv(), "yes");
    y.send("game2");
    y.send("Y");

    for expect in ["ridgame2,1,0", "playinfoA/2", "tokens2", "newcardP:1:1,0,0,0", "newcardB:0:0,1,0,0"] {
        assert_eq!(x.recv(), expect);
    }
    for expect in ["ridgame2,1,1", "playinfoB/2", "tokens2", "newcardP:1:1,0,0,0", "newcardB:0:0,1,0,0"] {
        assert_eq!(y.recv(), expect);
    }

    assert_eq!(x.recv(), "dowhat");
    x.send("take9,9,9,9");
    assert_eq!(x.recv(), "dowhat");
    x.send("banana");

    assert_eq!(x.recv(), "invalidA");
    assert_eq!(y.recv(), "invalidA");
    assert!(x.recv_opt().is_none());
    assert!(y.recv_opt().is_none());
}

/// Scenario 3: disconnect-without-timeout, spec §8.
#[test]
fn disconnect_without_timeout_closes_both_sockets() {
    let port = 19203;
    start_server(port, "k3", minimal_deck(), 2, 2, 1, Duration::from_secs(0));

    let mut x = Client::connect(port);
    x.send("playk3");
    assert_eq!(x.recv(), "yes");
    x.send("game3");
    x.send("X");

    let mut y = Client::connect(port);
    y.send("playk3");
    assert_eq!(y.recv(), "yes");
    y.send("game3");
    y.send("Y");

    for expect in ["ridgame3,1,0", "playinfoA/2", "tokens2", "newcardP:1:1,0,0,0", "newcardB:0:0,1,0,0"] {
        assert_eq!(x.recv(), expect);
    }
    for expect in ["ridgame3,1,1", "playinfoB/2", "tokens2", "newcardP:1:1,0,0,0", "newcardB:0:0,1,0,0"] {
        assert_eq!(y.recv(), expect);
    }

    assert_eq!(x.recv(), "dowhat");
    x.send("take1,1,1,0");
    assert_eq!(x.recv(), "tookA:1,1,1,0");
    assert_eq!(y.recv(), "tookA:1,1,1,0");

    assert_eq!(y.recv(), "dowhat");
    drop(y);

    assert_eq!(x.recv(), "discoB");
    assert!(x.recv_opt().is_none());
}

/// Scenario 4: reconnect flow, spec §8.
#[test]
fn reconnect_flow_resumes_play() {
    let port = 19204;
    start_server(port, "k4", minimal_deck(), 2, 2, 1, Duration::from_secs(5));

    let mut x = Client::connect(port);
    x.send("playk4");
    assert_eq!(x.recv(), "yes");
    x.send("game4");
    x.send("X");

    let mut y = Client::connect(port);
    y.send("playk4");
    assert_eq!(y.recv(), "yes");
    y.send("game4");
    y.send("Y");

    for expect in ["ridgame4,1,0", "playinfoA/2", "tokens2", "newcardP:1:1,0,0,0", "newcardB:0:0,1,0,0"] {
        assert_eq!(x.recv(), expect);
    }
    for expect in ["ridgame4,1,1", "playinfoB/2", "tokens2", "newcardP:1:1,0,0,0", "newcardB:0:0,1,0,0"] {
        assert_eq!(y.recv(), expect);
    }

    // Round 1: X, then Y, each play a no-cost `wild`.
    assert_eq!(x.recv(), "dowhat");
    x.send("wild");
    assert_eq!(x.recv(), "wildA");
    assert_eq!(y.recv(), "wildA");

    assert_eq!(y.recv(), "dowhat");
    y.send("wild");
    assert_eq!(x.recv(), "wildB");
    assert_eq!(y.recv(), "wildB");

    // Round 2: X plays again, then B disconnects mid-turn.
    assert_eq!(x.recv(), "dowhat");
    x.send("wild");
    assert_eq!(x.recv(), "wildA");
    assert_eq!(y.recv(), "wildA");

    assert_eq!(y.recv(), "dowhat");
    drop(y);

    let mut reconnected = Client::connect(port);
    reconnected.send("reconnectk4");
    assert_eq!(reconnected.recv(), "yes");
    reconnected.send("ridgame4,1,1");
    assert_eq!(reconnected.recv(), "yes");

    assert_eq!(reconnected.recv(), "playinfoB/2");
    assert_eq!(reconnected.recv(), "tokens2");
    assert_eq!(reconnected.recv(), "newcardP:1:1,0,0,0");
    assert_eq!(reconnected.recv(), "newcardB:0:0,1,0,0");
    assert_eq!(reconnected.recv(), "playerA:0:d=0,0,0,0:t=0,0,0,0,2");
    assert_eq!(reconnected.recv(), "playerB:0:d=0,0,0,0:t=0,0,0,0,1");

    assert_eq!(reconnected.recv(), "dowhat");
    reconnected.send("wild");
    assert_eq!(x.recv(), "wildB");
    assert_eq!(reconnected.recv(), "wildB");
}

/// Boundary behaviour: the `scores` endpoint works both before any
/// game starts (header only) and concurrently with a running game.
#[test]
fn scores_endpoint_before_and_during_game() {
    let port = 19205;
    start_server(port, "k5", minimal_deck(), 2, 2, 1, Duration::from_secs(5));

    let mut before = connect(port);
    before.write_all(b"scores\n").unwrap();
    let mut body = String::new();
    before.read_to_string(&mut body).unwrap();
    assert_eq!(body, "Player Name,Total Tokens,Total Points\n");

    let mut x = Client::connect(port);
    x.send("playk5");
    assert_eq!(x.recv(), "yes");
    x.send("scoreboard_game");
    x.send("X");

    let mut y = Client::connect(port);
    y.send("playk5");
    assert_eq!(y.recv(), "yes");
    y.send("scoreboard_game");
    y.send("Y");

    // The first rid line only arrives after the game has registered
    // itself with the registry, so this also confirms ordering.
    assert_eq!(x.recv(), "ridscoreboard_game,1,0");

    let mut during = connect(port);
    during.write_all(b"scores\n").unwrap();
    let mut body2 = String::new();
    during.read_to_string(&mut body2).unwrap();
    assert!(body2.starts_with("Player Name,Total Tokens,Total Points\n"));
    assert!(body2.contains("X,0,0"));
    assert!(body2.contains("Y,0,0"));
}
