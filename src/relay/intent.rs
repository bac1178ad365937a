//! Classification of inbound text: the start command and menu selections.

use crate::relay::l10n::{ALL_LOCALES, Catalog, Locale};

/// A menu selection, decoupled from the label text any one locale shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    CreateLink,
    Comments,
    About,
    Language,
    Back,
}

const MENU_KEYS: [(&str, MenuAction); 5] = [
    ("menu-create-link", MenuAction::CreateLink),
    ("menu-comments", MenuAction::Comments),
    ("menu-about", MenuAction::About),
    ("menu-language", MenuAction::Language),
    ("back", MenuAction::Back),
];

/// Classify text as a menu action by matching the labels of every
/// supported locale. A user who switched language mid-flow, or whose
/// keyboard still shows labels from an earlier locale, routes the same.
pub fn classify_menu(catalog: &Catalog, text: &str) -> Option<MenuAction> {
    let text = text.trim();
    for locale in ALL_LOCALES {
        for (key, action) in MENU_KEYS {
            if text == catalog.text(locale, key) {
                return Some(action);
            }
        }
    }
    None
}

/// Classify text as one of the fixed language buttons.
pub fn classify_language(text: &str) -> Option<Locale> {
    let text = text.trim();
    ALL_LOCALES.into_iter().find(|locale| locale.button_label() == text)
}

/// A parsed `/start` command with its optional deep-link payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCommand<'a> {
    pub payload: Option<&'a str>,
}

/// Parse a `/start` command, including the `/start@botname` form. The
/// payload is whatever follows the command, trimmed; it is not validated
/// here.
pub fn parse_start(text: &str) -> Option<StartCommand<'_>> {
    let text = text.trim();
    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next()?;
    let command = head.split('@').next().unwrap_or(head);
    if command != "/start" {
        return None;
    }
    let payload = parts.next().map(str::trim).filter(|p| !p.is_empty());
    Some(StartCommand { payload })
}
