//! The line-oriented wire protocol (spec §4.1): strict parse, and
//! `Display` for printing. Every message is one line ending in `\n`;
//! no whitespace is permitted inside a payload.

use std::fmt;

use crate::entities::{Colour, NUM_COLOURS};
use crate::error::ProtocolError;

fn err(msg: impl Into<String>) -> ProtocolError {
    ProtocolError::new(msg)
}

/// Parses a strict comma-separated list of `N` non-negative integers,
/// rejecting whitespace, signs, and any other shape.
fn parse_counts<const N: usize>(s: &str) -> Result<[u32; N], ProtocolError> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != N {
        return Err(err(format!("expected {N} comma-separated counts, got {}", parts.len())));
    }
    let mut out = [0u32; N];
    for (slot, part) in out.iter_mut().zip(parts.iter()) {
        *slot = parse_u32(part)?;
    }
    Ok(out)
}

fn parse_u32(s: &str) -> Result<u32, ProtocolError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err(format!("not a non-negative integer: {s:?}")));
    }
    s.parse().map_err(|_| err(format!("integer out of range: {s:?}")))
}

fn parse_letter(s: &str) -> Result<char, ProtocolError> {
    let mut chars = s.chars();
    let c = chars.next().ok_or_else(|| err("missing player letter"))?;
    if chars.next().is_some() || !c.is_ascii_uppercase() {
        return Err(err(format!("not a player letter: {s:?}")));
    }
    Ok(c)
}

fn fmt_counts(counts: &[u32]) -> String {
    counts.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",")
}

/// A card descriptor payload: `{D}:{V}:{pP},{pB},{pY},{pR}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardDescriptor {
    pub discount: Colour,
    pub value: u32,
    pub price: [u32; NUM_COLOURS],
}

impl CardDescriptor {
    pub fn of(card: &crate::entities::Card) -> Self {
        Self { discount: card.discount, value: card.value, price: card.price }
    }
}

impl fmt::Display for CardDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.discount, self.value, fmt_counts(&self.price))
    }
}

fn parse_card_descriptor(s: &str) -> Result<CardDescriptor, ProtocolError> {
    let mut parts = s.splitn(3, ':');
    let discount = parts.next().ok_or_else(|| err("missing card descriptor"))?;
    let value = parts.next().ok_or_else(|| err("missing card value"))?;
    let price = parts.next().ok_or_else(|| err("missing card price"))?;
    if parts.next().is_some() {
        return Err(err("trailing characters after card descriptor"));
    }
    let discount = parse_letter(discount).and_then(|c| Colour::from_char(c).ok_or_else(|| err(format!("unknown colour: {c:?}"))))?;
    let value = parse_u32(value)?;
    let price = parse_counts::<NUM_COLOURS>(price)?;
    Ok(CardDescriptor { discount, value, price })
}

/// Tokens spent or held, in the wire order `P,B,Y,R,W`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenSet {
    pub colours: [u32; NUM_COLOURS],
    pub wild: u32,
}

impl fmt::Display for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", fmt_counts(&self.colours), self.wild)
    }
}

fn parse_token_set(s: &str) -> Result<TokenSet, ProtocolError> {
    let counts = parse_counts::<5>(s)?;
    Ok(TokenSet {
        colours: [counts[0], counts[1], counts[2], counts[3]],
        wild: counts[4],
    })
}

/// Messages the server sends to a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToPlayer {
    Rid { name: String, counter: u32, id: usize },
    PlayInfo { letter: char, count: usize },
    Tokens { initial: u32 },
    NewCard(CardDescriptor),
    Purchased { letter: char, index: usize, spend: TokenSet },
    Took { letter: char, take: [u32; NUM_COLOURS] },
    Wild { letter: char },
    DoWhat,
    Eog,
    Disco { letter: char },
    Invalid { letter: char },
    PlayerCatchup { letter: char, score: u32, discounts: [u32; NUM_COLOURS], tokens: TokenSet },
}

impl fmt::Display for ToPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToPlayer::Rid { name, counter, id } => write!(f, "rid{name},{counter},{id}"),
            ToPlayer::PlayInfo { letter, count } => write!(f, "playinfo{letter}/{count}"),
            ToPlayer::Tokens { initial } => write!(f, "tokens{initial}"),
            ToPlayer::NewCard(card) => write!(f, "newcard{card}"),
            ToPlayer::Purchased { letter, index, spend } => write!(f, "purchased{letter}:{index}:{spend}"),
            ToPlayer::Took { letter, take } => write!(f, "took{letter}:{}", fmt_counts(take)),
            ToPlayer::Wild { letter } => write!(f, "wild{letter}"),
            ToPlayer::DoWhat => write!(f, "dowhat"),
            ToPlayer::Eog => write!(f, "eog"),
            ToPlayer::Disco { letter } => write!(f, "disco{letter}"),
            ToPlayer::Invalid { letter } => write!(f, "invalid{letter}"),
            ToPlayer::PlayerCatchup { letter, score, discounts, tokens } => {
                write!(f, "player{letter}:{score}:d={}:t={tokens}", fmt_counts(discounts))
            }
        }
    }
}

impl ToPlayer {
    /// Parses a line the way a player client would, without the
    /// trailing `\n`. Used by `zazu` and by protocol round-trip tests.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        if let Some(rest) = line.strip_prefix("rid") {
            let parts: Vec<&str> = rest.split(',').collect();
            let [name, counter, id] = <[&str; 3]>::try_from(parts).map_err(|_| err("malformed rid"))?;
            if name.is_empty() || name.contains(' ') {
                return Err(err("bad game name in rid"));
            }
            return Ok(ToPlayer::Rid {
                name: name.to_string(),
                counter: parse_u32(counter)?,
                id: parse_u32(id)? as usize,
            });
        }
        if let Some(rest) = line.strip_prefix("playinfo") {
            let (letter, count) = rest.split_once('/').ok_or_else(|| err("malformed playinfo"))?;
            return Ok(ToPlayer::PlayInfo { letter: parse_letter(letter)?, count: parse_u32(count)? as usize });
        }
        if let Some(rest) = line.strip_prefix("tokens") {
            return Ok(ToPlayer::Tokens { initial: parse_u32(rest)? });
        }
        if let Some(rest) = line.strip_prefix("newcard") {
            return Ok(ToPlayer::NewCard(parse_card_descriptor(rest)?));
        }
        if let Some(rest) = line.strip_prefix("purchased") {
            let mut parts = rest.splitn(3, ':');
            let letter = parts.next().ok_or_else(|| err("malformed purchased"))?;
            let index = parts.next().ok_or_else(|| err("malformed purchased"))?;
            let spend = parts.next().ok_or_else(|| err("malformed purchased"))?;
            if parts.next().is_some() {
                return Err(err("trailing characters after purchased"));
            }
            return Ok(ToPlayer::Purchased {
                letter: parse_letter(letter)?,
                index: parse_u32(index)? as usize,
                spend: parse_token_set(spend)?,
            });
        }
        if let Some(rest) = line.strip_prefix("took") {
            let (letter, take) = rest.split_once(':').ok_or_else(|| err("malformed took"))?;
            return Ok(ToPlayer::Took { letter: parse_letter(letter)?, take: parse_counts::<NUM_COLOURS>(take)? });
        }
        if let Some(rest) = line.strip_prefix("wild") {
            return Ok(ToPlayer::Wild { letter: parse_letter(rest)? });
        }
        if line == "dowhat" {
            return Ok(ToPlayer::DoWhat);
        }
        if line == "eog" {
            return Ok(ToPlayer::Eog);
        }
        if let Some(rest) = line.strip_prefix("disco") {
            return Ok(ToPlayer::Disco { letter: parse_letter(rest)? });
        }
        if let Some(rest) = line.strip_prefix("invalid") {
            return Ok(ToPlayer::Invalid { letter: parse_letter(rest)? });
        }
        if let Some(rest) = line.strip_prefix("player") {
            let mut parts = rest.splitn(4, ':');
            let letter = parts.next().ok_or_else(|| err("malformed player line"))?;
            let score = parts.next().ok_or_else(|| err("malformed player line"))?;
            let discounts = parts.next().ok_or_else(|| err("malformed player line"))?;
            let tokens = parts.next().ok_or_else(|| err("malformed player line"))?;
            let discounts = discounts.strip_prefix("d=").ok_or_else(|| err("missing d= in player line"))?;
            let tokens = tokens.strip_prefix("t=").ok_or_else(|| err("missing t= in player line"))?;
            return Ok(ToPlayer::PlayerCatchup {
                letter: parse_letter(letter)?,
                score: parse_u32(score)?,
                discounts: parse_counts::<NUM_COLOURS>(discounts)?,
                tokens: parse_token_set(tokens)?,
            });
        }
        Err(err(format!("unrecognized message: {line:?}")))
    }
}

/// Messages a player sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromPlayer {
    Wild,
    Take([u32; NUM_COLOURS]),
    Purchase { index: usize, spend: TokenSet },
}

impl fmt::Display for FromPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromPlayer::Wild => write!(f, "wild"),
            FromPlayer::Take(take) => write!(f, "take{}", fmt_counts(take)),
            FromPlayer::Purchase { index, spend } => write!(f, "purchase{index}:{spend}"),
        }
    }
}

impl FromPlayer {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        if line == "wild" {
            return Ok(FromPlayer::Wild);
        }
        if let Some(rest) = line.strip_prefix("take") {
            return Ok(FromPlayer::Take(parse_counts::<NUM_COLOURS>(rest)?));
        }
        if let Some(rest) = line.strip_prefix("purchase") {
            let (index, spend) = rest.split_once(':').ok_or_else(|| err("malformed purchase"))?;
            return Ok(FromPlayer::Purchase { index: parse_u32(index)? as usize, spend: parse_token_set(spend)? });
        }
        Err(err(format!("unrecognized message: {line:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_to_player(msg: ToPlayer) {
        let printed = msg.to_string();
        let parsed = ToPlayer::parse(&printed).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn roundtrip_all_to_player_forms() {
        roundtrip_to_player(ToPlayer::Rid { name: "g".into(), counter: 1, id: 0 });
        roundtrip_to_player(ToPlayer::PlayInfo { letter: 'A', count: 2 });
        roundtrip_to_player(ToPlayer::Tokens { initial: 4 });
        roundtrip_to_player(ToPlayer::NewCard(CardDescriptor { discount: Colour::Purple, value: 1, price: [1, 0, 0, 0] }));
        roundtrip_to_player(ToPlayer::Purchased {
            letter: 'A',
            index: 0,
            spend: TokenSet { colours: [1, 0, 0, 0], wild: 0 },
        });
        roundtrip_to_player(ToPlayer::Took { letter: 'B', take: [1, 1, 1, 0] });
        roundtrip_to_player(ToPlayer::Wild { letter: 'A' });
        roundtrip_to_player(ToPlayer::DoWhat);
        roundtrip_to_player(ToPlayer::Eog);
        roundtrip_to_player(ToPlayer::Disco { letter: 'B' });
        roundtrip_to_player(ToPlayer::Invalid { letter: 'A' });
        roundtrip_to_player(ToPlayer::PlayerCatchup {
            letter: 'A',
            score: 5,
            discounts: [1, 0, 0, 0],
            tokens: TokenSet { colours: [2, 0, 1, 0], wild: 1 },
        });
    }

    #[test]
    fn roundtrip_all_from_player_forms() {
        for msg in [
            FromPlayer::Wild,
            FromPlayer::Take([1, 1, 1, 0]),
            FromPlayer::Purchase { index: 0, spend: TokenSet { colours: [1, 0, 0, 0], wild: 0 } },
        ] {
            let printed = msg.to_string();
            assert_eq!(FromPlayer::parse(&printed).unwrap(), msg);
        }
    }

    #[test]
    fn rejects_whitespace_inside_payload() {
        assert!(FromPlayer::parse("take1, 1,1,0").is_err());
        assert!(ToPlayer::parse("wild A").is_err());
    }

    #[test]
    fn rejects_negative_counts() {
        assert!(FromPlayer::parse("take-1,1,1,0").is_err());
    }

    #[test]
    fn rejects_trailing_characters() {
        assert!(ToPlayer::parse("dowhatx").is_err());
        assert!(ToPlayer::parse("eogx").is_err());
    }

    #[test]
    fn rejects_wrong_count_arity() {
        assert!(FromPlayer::parse("take1,1,1").is_err());
        assert!(FromPlayer::parse("take1,1,1,0,0").is_err());
    }

    #[test]
    fn take_known_vector_matches_literal_wire_text() {
        assert_eq!(FromPlayer::Take([1, 1, 1, 0]).to_string(), "take1,1,1,0");
        assert_eq!(
            ToPlayer::Took { letter: 'A', take: [1, 1, 1, 0] }.to_string(),
            "tookA:1,1,1,0"
        );
    }
}
