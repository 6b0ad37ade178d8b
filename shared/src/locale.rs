//! Locales supported by the site.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cookie holding the visitor's persisted locale preference.
pub const LOCALE_COOKIE: &str = "NEXT_LOCALE";

/// Locale used when the preference is missing or unsupported.
pub const DEFAULT_LOCALE: Locale = Locale::En;

/// A supported UI/content locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// 简体中文
    Zh,
    /// English
    En,
}

impl Locale {
    /// All supported locales.
    pub const ALL: [Locale; 2] = [Locale::Zh, Locale::En];

    /// Cookie/query value of this locale.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
        }
    }

    /// Parse a persisted value, ignoring surrounding whitespace and ASCII
    /// case. Returns `None` for anything unsupported.
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "zh" => Some(Self::Zh),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        DEFAULT_LOCALE
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a supported locale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported locale `{0}`, expected `zh` or `en`")]
pub struct ParseLocaleError(pub String);

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cookie_value(s).ok_or_else(|| ParseLocaleError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_values_leniently() {
        assert_eq!(Locale::from_cookie_value("zh"), Some(Locale::Zh));
        assert_eq!(Locale::from_cookie_value(" EN "), Some(Locale::En));
        assert_eq!(Locale::from_cookie_value("zh-CN"), None);
        assert_eq!(Locale::from_cookie_value(""), None);
    }

    #[test]
    fn default_is_english() {
        assert_eq!(Locale::default(), Locale::En);
        assert_eq!("fr".parse::<Locale>(), Err(ParseLocaleError("fr".to_string())));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Locale::Zh).expect("encode"), r#""zh""#);
    }
}
