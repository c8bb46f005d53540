//! Core data types for the Austerity card game: colours, cards, tokens
//! and players. Pure data — no I/O, no game-flow logic (see `game`).

use std::fmt;

/// Minimum number of players a game may be configured for.
pub const MIN_PLAYERS: usize = 2;
/// Maximum number of players a game may be configured for.
pub const MAX_PLAYERS: usize = 26;
/// Maximum number of face-up cards on the board at once.
pub const BOARD_SIZE: usize = 8;
/// Non-wild colours a card/token pile can be.
pub const NUM_COLOURS: usize = 4;
/// Tokens required to make a valid non-wild take.
pub const TOKENS_PER_TAKE: usize = 3;

/// One of the four non-wild token/card colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colour {
    Purple,
    Brown,
    Yellow,
    Red,
}

impl Colour {
    pub const ALL: [Colour; NUM_COLOURS] = [Colour::Purple, Colour::Brown, Colour::Yellow, Colour::Red];

    pub fn from_char(c: char) -> Option<Colour> {
        match c {
            'P' => Some(Colour::Purple),
            'B' => Some(Colour::Brown),
            'Y' => Some(Colour::Yellow),
            'R' => Some(Colour::Red),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Colour::Purple => 'P',
            Colour::Brown => 'B',
            Colour::Yellow => 'Y',
            Colour::Red => 'R',
        }
    }

    pub fn index(self) -> usize {
        match self {
            Colour::Purple => 0,
            Colour::Brown => 1,
            Colour::Yellow => 2,
            Colour::Red => 3,
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// An immutable card loaded from the deckfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub discount: Colour,
    pub value: u32,
    pub price: [u32; NUM_COLOURS],
}

impl Card {
    pub fn price_of(&self, colour: Colour) -> u32 {
        self.price[colour.index()]
    }
}

/// A player's token holdings: four non-wild piles plus wilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tokens {
    pub colours: [u32; NUM_COLOURS],
    pub wild: u32,
}

impl Tokens {
    pub fn get(&self, colour: Colour) -> u32 {
        self.colours[colour.index()]
    }

    pub fn get_mut(&mut self, colour: Colour) -> &mut u32 {
        &mut self.colours[colour.index()]
    }

    pub fn total(&self) -> u32 {
        self.colours.iter().sum::<u32>() + self.wild
    }
}

/// A seated player: identity, score, permanent discounts and held tokens.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: usize,
    pub name: String,
    pub score: u32,
    pub discounts: [u32; NUM_COLOURS],
    pub tokens: Tokens,
}

impl Player {
    pub fn new(id: usize, name: String) -> Self {
        Self {
            id,
            name,
            score: 0,
            discounts: [0; NUM_COLOURS],
            tokens: Tokens::default(),
        }
    }

    pub fn letter(&self) -> char {
        (b'A' + self.id as u8) as char
    }

    pub fn discount_of(&self, colour: Colour) -> u32 {
        self.discounts[colour.index()]
    }
}

/// Letter-indexed player id, the inverse of [`Player::letter`].
pub fn letter_to_id(letter: char) -> Option<usize> {
    if letter.is_ascii_uppercase() {
        Some((letter as u8 - b'A') as usize)
    } else {
        None
    }
}
