//! Pure game state and rules: the board, the deck, purchase/take/wild
//! legality and application. No I/O; the driver in `server::driver`
//! owns the turn loop and talks to sockets.

use std::collections::VecDeque;

use crate::entities::{Card, Colour, Player, Tokens, BOARD_SIZE, NUM_COLOURS, TOKENS_PER_TAKE};

/// A running (or about-to-start) game's full state.
pub struct GameState {
    pub name: String,
    pub counter: u32,
    pub players: Vec<Player>,
    pub deck: VecDeque<Card>,
    pub board: Vec<Card>,
    /// On-board token pool per non-wild colour.
    pub token_count: [u32; NUM_COLOURS],
    pub initial_tokens: u32,
    pub win_score: u32,
}

impl GameState {
    pub fn new(
        name: String,
        counter: u32,
        players: Vec<Player>,
        deck: VecDeque<Card>,
        initial_tokens: u32,
        win_score: u32,
    ) -> Self {
        Self {
            name,
            counter,
            players,
            deck,
            board: Vec::with_capacity(BOARD_SIZE),
            token_count: [initial_tokens; NUM_COLOURS],
            initial_tokens,
            win_score,
        }
    }

    pub fn player(&self, id: usize) -> &Player {
        &self.players[id]
    }

    /// Draws one card from the deck onto the board, if any remain and
    /// there is room. Returns the drawn card so the caller can
    /// broadcast it.
    pub fn draw_card(&mut self) -> Option<Card> {
        if self.board.len() >= BOARD_SIZE {
            return None;
        }
        let card = self.deck.pop_front()?;
        self.board.push(card.clone());
        Some(card)
    }

    /// Removes the card at `index` from the board, shifting later
    /// cards down to keep insertion order, then refills from the deck
    /// if any remain. Returns the refill card, if drawn.
    pub fn take_card_from_board(&mut self, index: usize) -> (Card, Option<Card>) {
        let card = self.board.remove(index);
        let refill = self.draw_card();
        (card, refill)
    }

    pub fn board_empty(&self) -> bool {
        self.board.is_empty() && self.deck.is_empty()
    }

    /// Whether any player has reached the winning score. Checked at
    /// round boundaries only — see `server::driver`.
    pub fn any_player_has_won(&self) -> bool {
        self.players.iter().any(|p| p.score >= self.win_score)
    }

    /// Whether at least `TOKENS_PER_TAKE` non-wild piles are non-empty,
    /// i.e. a take is currently possible at all.
    pub fn can_take_tokens(&self) -> bool {
        self.token_count.iter().filter(|&&n| n > 0).count() >= TOKENS_PER_TAKE
    }

    /// The canonical wild-minimising spend for `player` buying `card`,
    /// per spec §4.2. Returns `None` if the player can't afford it.
    pub fn canonical_spend(&self, player_id: usize, card: &Card) -> Option<Tokens> {
        let player = &self.players[player_id];
        let mut spend = Tokens::default();
        let mut wild_needed: u32 = 0;

        for colour in Colour::ALL {
            let needed = card.price_of(colour).saturating_sub(player.discount_of(colour));
            let owned = player.tokens.get(colour);
            let from_colour = needed.min(owned);
            *spend.get_mut(colour) = from_colour;
            wild_needed += needed.saturating_sub(owned);
        }

        if wild_needed > player.tokens.wild {
            return None;
        }
        spend.wild = wild_needed;
        Some(spend)
    }

    /// Validates that `spend` exactly matches the canonical
    /// wild-minimising decomposition for this purchase.
    pub fn is_valid_purchase(&self, player_id: usize, card_index: usize, spend: &Tokens) -> bool {
        if card_index >= self.board.len() {
            return false;
        }
        let card = &self.board[card_index];
        match self.canonical_spend(player_id, card) {
            Some(canonical) => canonical == *spend,
            None => false,
        }
    }

    /// Applies a pre-validated purchase: removes the card, shifts and
    /// refills the board, returns tokens to the pool, and credits the
    /// buyer's discount/score.
    pub fn apply_purchase(&mut self, player_id: usize, card_index: usize, spend: &Tokens) -> (Card, Option<Card>) {
        let (card, refill) = self.take_card_from_board(card_index);

        let player = &mut self.players[player_id];
        for colour in Colour::ALL {
            let amount = spend.get(colour);
            *player.tokens.get_mut(colour) -= amount;
            self.token_count[colour.index()] += amount;
        }
        player.tokens.wild -= spend.wild;
        player.discounts[card.discount.index()] += 1;
        player.score += card.value;

        (card, refill)
    }

    /// A take is valid iff exactly three of the four non-wild colours
    /// are requested and each requested pile is currently non-empty.
    pub fn is_valid_take(&self, take: [u32; NUM_COLOURS]) -> bool {
        let mut count = 0;
        for (i, &amount) in take.iter().enumerate() {
            match amount {
                0 => {}
                1 => {
                    if self.token_count[i] == 0 {
                        return false;
                    }
                    count += 1;
                }
                _ => return false,
            }
        }
        count == TOKENS_PER_TAKE
    }

    pub fn apply_take(&mut self, player_id: usize, take: [u32; NUM_COLOURS]) {
        let player = &mut self.players[player_id];
        for colour in Colour::ALL {
            let amount = take[colour.index()];
            *player.tokens.get_mut(colour) += amount;
            self.token_count[colour.index()] -= amount;
        }
    }

    pub fn apply_wild(&mut self, player_id: usize) {
        self.players[player_id].tokens.wild += 1;
    }
}
