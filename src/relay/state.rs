//! Per-user conversation state.

use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::relay::l10n::Locale;

/// What the bot is waiting for from a given user.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Mode {
    /// Nothing pending; menu selections are honored here.
    #[default]
    Idle,
    /// The user opened someone's link; whatever arrives next is relayed
    /// to `receiver`.
    AwaitingRelayMessage { receiver: i64 },
    /// Collecting comments; every text except the Back label is recorded.
    AwaitingComment,
    /// The next text should be one of the language buttons.
    AwaitingLanguageChoice,
}

/// Conversation state for one user: the current mode plus the chosen
/// locale. The locale survives every mode change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Conversation {
    pub mode: Mode,
    pub locale: Option<Locale>,
}

impl Conversation {
    /// Move to another mode, carrying the locale forward.
    pub fn with_mode(&self, mode: Mode) -> Self {
        Self { mode, locale: self.locale }
    }

    /// Back to the main menu. Only the mode is cleared.
    pub fn reset(&self) -> Self {
        self.with_mode(Mode::Idle)
    }

    /// Record a language choice without touching the mode.
    pub fn with_locale(&self, locale: Locale) -> Self {
        Self { mode: self.mode, locale: Some(locale) }
    }
}

/// Dialogue handle keyed by chat; private chats make that the user.
pub type RelayDialogue = Dialogue<Conversation, InMemStorage<Conversation>>;
