//! Reply keyboards shown with menu prompts.

use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::relay::l10n::{ALL_LOCALES, Catalog, Locale};

/// Main menu in its 1-2-1 layout: the link button on top, comments and
/// about side by side, language below.
pub fn main_menu(catalog: &Catalog, locale: Locale) -> KeyboardMarkup {
    let [create, comments, about, language] = catalog.menu_labels(locale);
    KeyboardMarkup::new([
        vec![KeyboardButton::new(create)],
        vec![KeyboardButton::new(comments), KeyboardButton::new(about)],
        vec![KeyboardButton::new(language)],
    ])
    .resize_keyboard()
}

/// A single Back button, shown while collecting comments.
pub fn back_only(catalog: &Catalog, locale: Locale) -> KeyboardMarkup {
    KeyboardMarkup::new([[KeyboardButton::new(catalog.back_label(locale))]]).resize_keyboard()
}

/// One row per supported language. The labels are fixed across locales,
/// so the keyboard is too.
pub fn language_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(ALL_LOCALES.map(|locale| [KeyboardButton::new(locale.button_label())]))
        .resize_keyboard()
}
