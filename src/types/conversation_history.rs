use serde::Serialize;

use crate::types::ChatTurn;

/// The ordered, append-only list of turns for one session.
///
/// Turns are kept exactly in the order they were sent or received.  The only way to remove a
/// turn is to tear the whole history down with [`ConversationHistory::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<ChatTurn>,
}

impl ConversationHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn at the end of the history.
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// The turns in conversation order.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The most recent turn, if any.
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Number of turns recorded.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if no turn has been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn.  Used on session teardown.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
