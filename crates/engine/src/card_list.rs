//! Parsing of free-text card lists.
//!
//! A card list is one entry per line in the `<quantity> <card name>` format
//! used by MTGO exports, e.g.
//!
//! ```text
//! 1 Sheoldred, the Apocalypse
//! 3 Ketria Triome
//! ```
//!
//! Card names are free text; they are not checked against a card database.
//!
//! Stricter than a bare `<int> <name>` split: besides lines with no space or
//! a non-digit quantity, a line is also rejected when the card name is blank (`"3 "`),
//! the quantity is zero, or it would push a card or the whole list above
//! [`MAX_QUANTITY`].

use indexmap::IndexMap;

use crate::{EngineError, ResultEngine};

/// Upper bound for one card and for a whole list.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Requested quantity per card, in order of first appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardList {
    cards: IndexMap<String, i64>,
}

impl CardList {
    /// Parses every line, summing quantities of repeated card names.
    ///
    /// Parsing does not stop at the first bad line: all malformed lines are
    /// collected and returned together in [`EngineError::CardListInput`].
    pub fn parse<I, S>(lines: I) -> ResultEngine<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cards: IndexMap<String, i64> = IndexMap::new();
        let mut total = 0;
        let mut malformed = Vec::new();

        for line in lines {
            let line = line.as_ref();
            let Some((card, quantity)) = parse_line(line) else {
                malformed.push(line.to_string());
                continue;
            };
            let card_total = cards.get(card).copied().unwrap_or(0) + quantity;
            let list_total = total + quantity;
            if card_total > MAX_QUANTITY || list_total > MAX_QUANTITY {
                malformed.push(line.to_string());
                continue;
            }
            cards.insert(card.to_string(), card_total);
            total = list_total;
        }

        if !malformed.is_empty() {
            return Err(EngineError::CardListInput(malformed));
        }
        Ok(Self { cards })
    }

    /// Parses a newline separated block of text, as typed in a chat modal.
    pub fn from_text(text: &str) -> ResultEngine<Self> {
        Self::parse(text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.cards.iter().map(|(card, qty)| (card.as_str(), *qty))
    }

    pub fn get(&self, card: &str) -> Option<i64> {
        self.cards.get(card).copied()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Sum of all requested quantities, at most [`MAX_QUANTITY`].
    pub fn total(&self) -> i64 {
        self.cards.values().sum()
    }
}

/// Splits on the first space only; card names may contain spaces.
fn parse_line(line: &str) -> Option<(&str, i64)> {
    let (quantity, card) = line.split_once(' ')?;
    if quantity.is_empty() || !quantity.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if card.trim().is_empty() {
        return None;
    }
    let quantity: i64 = quantity.parse().ok()?;
    (quantity > 0 && quantity <= MAX_QUANTITY).then_some((card, quantity))
}
