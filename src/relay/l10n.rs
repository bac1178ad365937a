//! Localized string catalog for the supported languages.

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::FluentResource;
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// A language the bot can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    En,
    Ru,
    Uz,
}

/// Supported locales, in the order the language keyboard shows them.
pub const ALL_LOCALES: [Locale; 3] = [Locale::En, Locale::Ru, Locale::Uz];

impl Locale {
    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
            Locale::Uz => "uz",
        }
    }

    /// Parse a language code the platform reports ("en", "ru-RU", ...).
    /// Unsupported codes get no locale; callers fall back to English.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(|c| c == '-' || c == '_').next().unwrap_or(code);
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Locale::En),
            "ru" => Some(Locale::Ru),
            "uz" => Some(Locale::Uz),
            _ => None,
        }
    }

    /// The fixed button label on the language keyboard. These are the same
    /// in every locale, so switching by button always works.
    pub fn button_label(self) -> &'static str {
        match self {
            Locale::En => "🇺🇸 English",
            Locale::Ru => "🇷🇺 Русский",
            Locale::Uz => "🇺🇿 O'zbekcha",
        }
    }
}

type Bundle = FluentBundle<FluentResource>;

/// Errors building the catalog from the embedded resources.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid locale identifier '{0}'")]
    Language(&'static str),
    #[error("malformed fluent resource for locale '{0}'")]
    Resource(&'static str),
    #[error("duplicate message ids in locale '{0}'")]
    Duplicate(&'static str),
}

const EN_FTL: &str = include_str!("../../locales/en.ftl");
const RU_FTL: &str = include_str!("../../locales/ru.ftl");
const UZ_FTL: &str = include_str!("../../locales/uz.ftl");

/// Localized strings, one fluent bundle per supported locale.
///
/// Bundles are built concurrent so the catalog can be shared across the
/// dispatcher's tasks.
pub struct Catalog {
    en: Bundle,
    ru: Bundle,
    uz: Bundle,
}

impl Catalog {
    /// Build the catalog from the embedded `.ftl` resources.
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Self {
            en: build_bundle("en", EN_FTL)?,
            ru: build_bundle("ru", RU_FTL)?,
            uz: build_bundle("uz", UZ_FTL)?,
        })
    }

    fn bundle(&self, locale: Locale) -> &Bundle {
        match locale {
            Locale::En => &self.en,
            Locale::Ru => &self.ru,
            Locale::Uz => &self.uz,
        }
    }

    /// Look up a message, falling back to English for untranslated keys.
    /// An id missing everywhere comes back verbatim so the failure is
    /// visible in the chat rather than swallowed.
    pub fn text(&self, locale: Locale, key: &str) -> String {
        for bundle in [self.bundle(locale), &self.en] {
            let Some(message) = bundle.get_message(key) else { continue };
            let Some(pattern) = message.value() else { continue };
            let mut errors = Vec::new();
            let text = bundle.format_pattern(pattern, None, &mut errors).into_owned();
            if !errors.is_empty() {
                warn!("Fluent errors formatting '{key}': {errors:?}");
            }
            return text;
        }
        warn!("No translation for '{key}' in any locale");
        key.to_string()
    }

    /// The four main-menu labels for a locale, in display order.
    pub fn menu_labels(&self, locale: Locale) -> [String; 4] {
        [
            self.text(locale, "menu-create-link"),
            self.text(locale, "menu-comments"),
            self.text(locale, "menu-about"),
            self.text(locale, "menu-language"),
        ]
    }

    /// The localized Back label shown while collecting comments.
    pub fn back_label(&self, locale: Locale) -> String {
        self.text(locale, "back")
    }
}

fn build_bundle(code: &'static str, source: &str) -> Result<Bundle, CatalogError> {
    let langid: LanguageIdentifier = code.parse().map_err(|_| CatalogError::Language(code))?;
    let mut bundle = Bundle::new_concurrent(vec![langid]);
    // The strings go straight into chat messages, so keep Unicode isolation
    // marks out of formatted output.
    bundle.set_use_isolating(false);

    let resource = FluentResource::try_new(source.to_string())
        .map_err(|_| CatalogError::Resource(code))?;
    bundle.add_resource(resource).map_err(|_| CatalogError::Duplicate(code))?;
    Ok(bundle)
}
