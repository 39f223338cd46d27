use serde::{Deserialize, Serialize};

pub mod parser;
pub mod prompt;

pub use parser::{parse, parse_limited};
pub use prompt::PromptTemplate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

impl Flashcard {
    /// Build a card from trimmed text; `None` when either side is blank.
    pub fn new(question: &str, answer: &str) -> Option<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return None;
        }
        Some(Self {
            question: question.to_string(),
            answer: answer.to_string(),
        })
    }
}

/// Accumulates cards in generation order up to a fixed cap.
#[derive(Debug)]
pub struct CardBudget {
    cards: Vec<Flashcard>,
    cap: usize,
}

impl CardBudget {
    pub fn new(cap: usize) -> Self {
        Self { cards: Vec::new(), cap }
    }

    pub fn remaining(&self) -> usize {
        self.cap.saturating_sub(self.cards.len())
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Take cards until the cap is hit; returns how many were kept.
    pub fn extend(&mut self, cards: impl IntoIterator<Item = Flashcard>) -> usize {
        let before = self.cards.len();
        let remaining = self.remaining();
        self.cards.extend(cards.into_iter().take(remaining));
        self.cards.len() - before
    }

    pub fn into_cards(self) -> Vec<Flashcard> {
        self.cards
    }
}
