//! Locale negotiation from the persisted `NEXT_LOCALE` cookie.
//!
//! The same cookie state resolves to the same [`Locale`] whether it comes
//! from an incoming request's `Cookie` header (server rendering) or from the
//! client-side [`CookieJar`].

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, COOKIE};
use xiaoli_shared::{Locale, DEFAULT_LOCALE, LOCALE_COOKIE};

/// Read access to cookies.
pub trait CookieSource {
    /// Value of the first cookie called `name`.
    fn cookie(&self, name: &str) -> Option<String>;
}

impl<T: CookieSource + ?Sized> CookieSource for &T {
    fn cookie(&self, name: &str) -> Option<String> {
        (**self).cookie(name)
    }
}

/// A raw `Cookie` request header value, e.g. `theme=dark; NEXT_LOCALE=zh`.
#[derive(Debug, Clone, Copy)]
pub struct CookieHeader<'a>(pub &'a str);

impl CookieSource for CookieHeader<'_> {
    fn cookie(&self, name: &str) -> Option<String> {
        parse_pairs(self.0)
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

impl CookieSource for HeaderMap {
    fn cookie(&self, name: &str) -> Option<String> {
        self.get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| CookieHeader(header).cookie(name))
    }
}

/// Client-side cookie store holding persisted preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    /// Empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a jar from a `Cookie` header value; the first occurrence of a
    /// name wins.
    pub fn parse(header: &str) -> Self {
        let mut cookies = BTreeMap::new();
        for (name, value) in parse_pairs(header) {
            cookies
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
        Self {
            cookies,
        }
    }

    /// Store a cookie.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Remove a cookie.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.cookies.remove(name)
    }

    /// Persist the visitor's locale choice (language switcher).
    pub fn set_locale(&mut self, locale: Locale) {
        self.set(LOCALE_COOKIE, locale.as_str());
    }

    /// Render as a `Cookie` header value.
    pub fn to_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl CookieSource for CookieJar {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }
}

/// Active locale: the `NEXT_LOCALE` cookie when it names a supported locale,
/// [`DEFAULT_LOCALE`] otherwise.
pub fn resolve_locale(source: &(impl CookieSource + ?Sized)) -> Locale {
    let Some(raw) = source.cookie(LOCALE_COOKIE) else {
        return DEFAULT_LOCALE;
    };
    match Locale::from_cookie_value(&raw) {
        Some(locale) => locale,
        None => {
            tracing::debug!(value = %raw, "unsupported locale cookie, using fallback");
            DEFAULT_LOCALE
        },
    }
}

fn parse_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(value);
        Some((name, value))
    })
}
