//! Loaders for the three external file formats: keyfile, deckfile and
//! statfile (spec §4.8).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::entities::{Card, Colour, MAX_PLAYERS, MIN_PLAYERS};
use crate::error::ConfigError;

/// One statfile line: the game shape offered by a listening port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatfileEntry {
    pub port: u16,
    pub tokens: u32,
    pub points: u32,
    pub players: u8,
}

/// Splits file contents into non-blank lines, tolerating exactly one
/// optional trailing newline. Any other blank line is left in the
/// output so callers reject it when parsing that line fails.
fn split_lines(content: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = content.split('\n').collect();
    if content.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Loads the keyfile. Valid iff it holds exactly one non-empty line,
/// with no newline except an optional single trailing one.
pub fn load_keyfile(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::BadKeyfile)?;
    if content.is_empty() {
        return Err(ConfigError::BadKeyfile);
    }
    let body = content.strip_suffix('\n').unwrap_or(&content);
    if body.is_empty() || body.contains('\n') {
        return Err(ConfigError::BadKeyfile);
    }
    Ok(body.to_string())
}

fn parse_card(line: &str) -> Option<Card> {
    let mut parts = line.splitn(3, ':');
    let colour = parts.next()?;
    let value = parts.next()?;
    let prices = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let mut colour_chars = colour.chars();
    let colour_char = colour_chars.next()?;
    if colour_chars.next().is_some() {
        return None;
    }
    let discount = Colour::from_char(colour_char)?;
    let value: u32 = value.parse().ok()?;

    let price_parts: Vec<&str> = prices.split(',').collect();
    if price_parts.len() != 4 {
        return None;
    }
    let mut price = [0u32; 4];
    for (slot, part) in price.iter_mut().zip(price_parts.iter()) {
        *slot = part.parse().ok()?;
    }

    Some(Card { discount, value, price })
}

/// Loads the deckfile: one card per line, at least one card, no blank
/// lines, optional trailing newline.
pub fn load_deckfile(path: &Path) -> Result<Vec<Card>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::BadDeckfile)?;
    let lines = split_lines(&content);
    if lines.is_empty() {
        return Err(ConfigError::BadDeckfile);
    }

    lines
        .into_iter()
        .map(|line| parse_card(line).ok_or(ConfigError::BadDeckfile))
        .collect()
}

fn parse_statfile_entry(line: &str) -> Option<StatfileEntry> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != 4 {
        return None;
    }
    let port: u16 = parts[0].parse().ok()?;
    let tokens: u32 = parts[1].parse().ok()?;
    let points: u32 = parts[2].parse().ok()?;
    let players: u8 = parts[3].parse().ok()?;

    if tokens < 1 || points < 1 || (players as usize) < MIN_PLAYERS || (players as usize) > MAX_PLAYERS {
        return None;
    }

    Some(StatfileEntry { port, tokens, points, players })
}

/// Loads the statfile: one entry per line, no trailing newline
/// permitted. Strict like the keyfile — the original hub's
/// `load_statfile` ANDs its result with `!does_file_end_newline`, the
/// same check `get_keyfile` uses, so a statfile ending in `\n` is
/// rejected just as a keyfile with one is. Explicitly rejects
/// duplicate non-zero ports (see SPEC_FULL.md — the original C hub
/// silently ignored this case).
pub fn load_statfile(path: &Path) -> Result<Vec<StatfileEntry>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::BadStatfile)?;
    if content.is_empty() || content.ends_with('\n') {
        return Err(ConfigError::BadStatfile);
    }

    let mut entries = Vec::new();
    let mut seen_ports: HashSet<u16> = HashSet::new();
    for line in content.split('\n') {
        let entry = parse_statfile_entry(line).ok_or(ConfigError::BadStatfile)?;
        if entry.port != 0 && !seen_ports.insert(entry.port) {
            return Err(ConfigError::BadStatfile);
        }
        entries.push(entry);
    }

    Ok(entries)
}
