//! Locale-aware, deduplicated data fetching for the 小李生活志 front-end.
//!
//! - [`http`] executes requests and folds every outcome into a
//!   [`xiaoli_shared::ResponseEnvelope`].
//! - [`cache`] keeps one entry per `(path, locale)` and runs at most one
//!   request per entry at a time.
//! - [`hooks`] is what components subscribe through.
//! - [`locale`] resolves the active locale from the `NEXT_LOCALE` cookie.

pub mod api;
pub mod cache;
pub mod config;
pub mod hooks;
pub mod http;
pub mod i18n;
pub mod locale;
pub mod progress;

pub use cache::{CacheKey, CacheStore, FetchOptions, FetchPolicy};
pub use config::ClientConfig;
pub use hooks::{use_cached_resource, FetchContext, Resource, ResourceState};
pub use http::{HttpClient, HttpMethod, RequestOptions};
pub use locale::{resolve_locale, CookieHeader, CookieJar, CookieSource};
