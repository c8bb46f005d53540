//! Connection handler (spec §4.7): performs the handshake and
//! dispatches to new-game join, reconnect, or a scoreboard dump.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use log::error;

use crate::config::StatfileEntry;
use crate::entities::Card;
use crate::protocol::{CardDescriptor, ToPlayer, TokenSet};

use super::lobby::LobbyMatcher;
use super::{driver, GamesRegistry};

pub struct ConnectionContext {
    pub key: String,
    pub deck: Vec<Card>,
    pub timeout: Duration,
    pub games: GamesRegistry,
    pub lobby: Arc<LobbyMatcher>,
}

pub fn handle(mut stream: TcpStream, ctx: Arc<ConnectionContext>, entry: StatfileEntry) {
    let Ok(Some(first)) = read_line(&mut stream) else {
        return;
    };

    if let Some(rest) = first.strip_prefix("play") {
        if rest != ctx.key {
            reply(&mut stream, "no");
            return;
        }
        reply(&mut stream, "yes");
        handle_new(stream, &ctx, entry);
    } else if let Some(rest) = first.strip_prefix("reconnect") {
        if rest != ctx.key {
            reply(&mut stream, "no");
            return;
        }
        reply(&mut stream, "yes");
        handle_reconnect(stream, &ctx);
    } else if first == "scores" {
        handle_scores(stream, &ctx);
    } else {
        reply(&mut stream, "no");
    }
}

fn handle_new(mut stream: TcpStream, ctx: &ConnectionContext, entry: StatfileEntry) {
    let Ok(Some(game_name)) = read_line(&mut stream) else { return };
    let Ok(Some(player_name)) = read_line(&mut stream) else { return };
    if !valid_name(&game_name) || !valid_name(&player_name) {
        return;
    }

    if let Some(ready) = ctx.lobby.join(&game_name, entry, player_name, stream) {
        let deck: VecDeque<Card> = ctx.deck.iter().cloned().collect();
        if let Err(e) = driver::spawn(
            ready.name.clone(),
            ready.players,
            deck,
            ready.entry.tokens,
            ready.entry.points,
            ctx.timeout,
            ctx.games.clone(),
        ) {
            error!("failed to start game {}: {e}", ready.name);
        }
    }
}

fn handle_reconnect(mut stream: TcpStream, ctx: &ConnectionContext) {
    let Ok(Some(rid_line)) = read_line(&mut stream) else { return };
    let Some((name, counter, player_id)) = parse_rid(&rid_line) else {
        reply(&mut stream, "no");
        return;
    };
    let Some(target) = ctx.games.find(&name, counter) else {
        reply(&mut stream, "no");
        return;
    };
    if player_id >= target.player_count {
        reply(&mut stream, "no");
        return;
    }

    if !target.wait_for_slot(player_id) {
        reply(&mut stream, "no");
        return;
    }

    reply(&mut stream, "yes");
    let catchup = target.catchup_snapshot();
    let Some(me) = catchup.players.get(player_id) else {
        return;
    };

    write_line(&mut stream, &ToPlayer::PlayInfo { letter: me.letter, count: target.player_count }.to_string());
    write_line(&mut stream, &ToPlayer::Tokens { initial: catchup.initial_tokens }.to_string());
    for card in &catchup.board {
        write_line(&mut stream, &ToPlayer::NewCard(CardDescriptor::of(card)).to_string());
    }
    for line in &catchup.players {
        let msg = ToPlayer::PlayerCatchup {
            letter: line.letter,
            score: line.score,
            discounts: line.discounts,
            tokens: TokenSet { colours: line.tokens.colours, wild: line.tokens.wild },
        };
        write_line(&mut stream, &msg.to_string());
    }

    target.hand_off_socket(stream);
}

fn handle_scores(mut stream: TcpStream, ctx: &ConnectionContext) {
    let csv = super::scores_csv(&ctx.games);
    let _ = stream.write_all(csv.as_bytes());
}

fn valid_name(s: &str) -> bool {
    !s.is_empty() && !s.contains(',') && !s.contains('\n')
}

fn parse_rid(line: &str) -> Option<(String, u32, usize)> {
    let rest = line.strip_prefix("rid")?;
    let parts: Vec<&str> = rest.split(',').collect();
    let [name, counter, player_id] = <[&str; 3]>::try_from(parts).ok()?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), strict_u32(counter)?, strict_u32(player_id)? as usize))
}

fn strict_u32(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn reply(stream: &mut TcpStream, msg: &str) {
    write_line(stream, msg);
}

fn write_line(stream: &mut TcpStream, msg: &str) {
    let _ = writeln!(stream, "{msg}");
}

/// Reads one line byte-by-byte rather than through a buffered reader,
/// so no bytes beyond the line are consumed from the socket before
/// ownership of the raw `TcpStream` passes to the lobby or the driver.
fn read_line(stream: &mut TcpStream) -> std::io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) if byte[0] == b'\n' => return Ok(Some(String::from_utf8_lossy(&line).into_owned())),
            Ok(_) => line.push(byte[0]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
