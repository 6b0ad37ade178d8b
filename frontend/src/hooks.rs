//! Cache-backed fetch hooks.
//!
//! [`use_cached_resource`] is the one entry point; the fetch policy is part
//! of its [`FetchOptions`]. The domain hooks below compose their cache key
//! from an endpoint path and the locale resolved from cookies.
//!
//! ```no_run
//! use xiaoli_frontend::{
//!     hooks::{use_section_lists, FetchContext},
//!     locale::CookieHeader,
//! };
//!
//! # async fn render(ctx: &FetchContext) {
//! let mut sections = use_section_lists(ctx, &CookieHeader("NEXT_LOCALE=zh"));
//! let state = sections.settled().await;
//! if let Some(list) = state.data {
//!     println!("{} sections", list.len());
//! }
//! # }
//! ```

use std::{future::Future, marker::PhantomData, sync::Arc, time::Duration};

use futures::{future::BoxFuture, FutureExt};
use tokio::{sync::watch, task::JoinHandle};
use xiaoli_shared::{
    paths, ApiError, Locale, MediaAsset, MediaKind, Payment, Profile, ProfileUpdate,
    ResponseEnvelope, SavedBlog, Section, NO_RESPONSE_STATUS,
};

use crate::{
    api,
    cache::{CacheEntry, CacheKey, CacheStore, CachedValue, FetchOptions, Fetcher, Outcome},
    http::HttpClient,
    locale::{resolve_locale, CookieSource},
};

/// Cookie carrying the dashboard session token.
pub const SESSION_COOKIE: &str = "xiaoli_session";

/// Polling period of the payments page.
pub const PAYMENTS_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// What a component renders from: the only shape this layer exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    /// Payload of the most recent successful resolution.
    pub data: Option<T>,
    /// Error of the most recent failed resolution.
    pub error: Option<ApiError>,
    /// No value is cached yet and a request is in flight.
    pub is_loading: bool,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
        }
    }
}

impl<T: Clone + 'static> ResourceState<T> {
    fn from_entry(entry: &CacheEntry) -> Self {
        let is_loading = entry.is_loading();
        match &entry.outcome {
            Some(Ok(value)) => match value.downcast_ref::<Option<T>>() {
                Some(data) => Self {
                    data: data.clone(),
                    error: None,
                    is_loading,
                },
                None => {
                    tracing::error!(
                        expected = std::any::type_name::<T>(),
                        "cached value has a different type"
                    );
                    Self {
                        data: None,
                        error: Some(ApiError::new(
                            NO_RESPONSE_STATUS,
                            "cached value has an unexpected type",
                        )),
                        is_loading,
                    }
                },
            },
            Some(Err(err)) => Self {
                data: None,
                error: Some(err.clone()),
                is_loading,
            },
            None => Self {
                data: None,
                error: None,
                is_loading,
            },
        }
    }
}

/// A component's subscription to one cached resource.
///
/// Dropping it is the unmount: the view detaches, its polling timer stops,
/// and requests other subscribers depend on keep running.
pub struct Resource<T> {
    store: CacheStore,
    options: FetchOptions,
    fetcher: Fetcher,
    key: Option<CacheKey>,
    receiver: Option<watch::Receiver<CacheEntry>>,
    refresh_task: Option<JoinHandle<()>>,
    _marker: PhantomData<fn() -> T>,
}

/// Subscribe to `key`, fetching through `fetch` when the policy requires.
///
/// A `None` key fetches nothing and stays at the default state.
pub fn use_cached_resource<T, F, Fut>(
    store: &CacheStore,
    key: Option<CacheKey>,
    options: FetchOptions,
    fetch: F,
) -> Resource<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(CacheKey) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ResponseEnvelope<T>> + Send + 'static,
{
    let fetcher: Fetcher = Arc::new(move |key: CacheKey| -> BoxFuture<'static, Outcome> {
        fetch(key)
            .map(|envelope| envelope.into_result().map(CachedValue::new))
            .boxed()
    });
    let mut resource = Resource {
        store: store.clone(),
        options,
        fetcher,
        key: None,
        receiver: None,
        refresh_task: None,
        _marker: PhantomData,
    };
    resource.set_key(key);
    resource
}

impl<T: Clone + Send + Sync + 'static> Resource<T> {
    /// Current cache key.
    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    /// Snapshot for rendering.
    pub fn state(&self) -> ResourceState<T> {
        match &self.receiver {
            Some(receiver) => ResourceState::from_entry(&receiver.borrow()),
            None => ResourceState::default(),
        }
    }

    /// Wait for the next update of the current key and return it.
    ///
    /// Returns immediately when the key is `None`.
    pub async fn changed(&mut self) -> ResourceState<T> {
        if let Some(receiver) = self.receiver.as_mut() {
            if receiver.changed().await.is_err() {
                tracing::trace!("cache slot closed");
            }
        }
        self.state()
    }

    /// Wait until the resource is no longer loading.
    pub async fn settled(&mut self) -> ResourceState<T> {
        if let Some(receiver) = self.receiver.as_mut() {
            if receiver.wait_for(|entry| !entry.is_loading()).await.is_err() {
                tracing::trace!("cache slot closed");
            }
        }
        self.state()
    }

    /// Switch to another key, detaching from the previous one first.
    pub fn set_key(&mut self, key: Option<CacheKey>) {
        if self.receiver.is_some() && self.key == key {
            return;
        }
        self.detach();
        if let Some(key) = &key {
            self.receiver = Some(
                self.store
                    .subscribe(key, &self.options, self.fetcher.clone()),
            );
            self.refresh_task = self.spawn_refresh(key);
        }
        self.key = key;
    }

    /// Manually refetch the current key, whatever the policy.
    pub fn revalidate(&self) {
        if let Some(key) = &self.key {
            self.store.invalidate(key);
        }
    }

    fn spawn_refresh(&self, key: &CacheKey) -> Option<JoinHandle<()>> {
        let period = self.options.policy.refresh_interval()?;
        let store = self.store.clone();
        let key = key.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // interval 的第一次 tick 立即完成
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.revalidate(&key);
            }
        }))
    }

    fn detach(&mut self) {
        self.receiver = None;
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }
}

impl<T> Drop for Resource<T> {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }
}

/// Everything the domain hooks need: one HTTP client and one cache store.
#[derive(Clone)]
pub struct FetchContext {
    /// Request executor.
    pub client: HttpClient,
    /// Shared response cache.
    pub store: CacheStore,
}

impl FetchContext {
    /// Bundle a client with a fresh store.
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            store: CacheStore::new(),
        }
    }
}

fn session_token(cookies: &(impl CookieSource + ?Sized)) -> Option<String> {
    cookies
        .cookie(SESSION_COOKIE)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Site sections in the visitor's locale. Immutable: fetched once per locale.
pub fn use_section_lists(
    ctx: &FetchContext,
    cookies: &(impl CookieSource + ?Sized),
) -> Resource<Vec<Section>> {
    let key = CacheKey::new(paths::SECTION_LISTS, resolve_locale(cookies));
    let client = ctx.client.clone();
    use_cached_resource(&ctx.store, Some(key), FetchOptions::immutable(), move |key: CacheKey| {
        let client = client.clone();
        async move { api::fetch_section_lists(&client, key.locale()).await }
    })
}

/// Signed-in user's profile; nothing is fetched without a session.
pub fn use_profile(
    ctx: &FetchContext,
    cookies: &(impl CookieSource + ?Sized),
) -> Resource<Profile> {
    use_dashboard(
        ctx,
        cookies,
        paths::PROFILE,
        FetchOptions::revalidating(),
        |client, locale, token| async move { api::fetch_profile(&client, locale, &token).await },
    )
}

/// Bookmarked blogs; nothing is fetched without a session.
pub fn use_saved_blogs(
    ctx: &FetchContext,
    cookies: &(impl CookieSource + ?Sized),
) -> Resource<Vec<SavedBlog>> {
    use_dashboard(
        ctx,
        cookies,
        paths::SAVED_BLOGS,
        FetchOptions::revalidating(),
        |client, locale, token| async move {
            api::fetch_saved_blogs(&client, locale, &token).await
        },
    )
}

/// Payment history, polled while subscribed; nothing is fetched without a
/// session.
pub fn use_payments(
    ctx: &FetchContext,
    cookies: &(impl CookieSource + ?Sized),
) -> Resource<Vec<Payment>> {
    use_dashboard(
        ctx,
        cookies,
        paths::PAYMENTS,
        FetchOptions::revalidating().with_refresh_interval(PAYMENTS_REFRESH_INTERVAL),
        |client, locale, token| async move { api::fetch_payments(&client, locale, &token).await },
    )
}

/// Media library shown by the picker modal of `kind`; nothing is fetched
/// without a session.
pub fn use_media_library(
    ctx: &FetchContext,
    cookies: &(impl CookieSource + ?Sized),
    kind: MediaKind,
) -> Resource<Vec<MediaAsset>> {
    use_dashboard(
        ctx,
        cookies,
        kind.library_path(),
        FetchOptions::revalidating(),
        move |client, locale, token| async move {
            api::list_media(&client, locale, &token, kind).await
        },
    )
}

/// Key of a session-owned resource; `None` without a session.
///
/// The session token is the key's scope, so each session gets its own
/// entry and every refetch of that entry runs with that session's token.
pub fn session_key(
    path: impl Into<String>,
    cookies: &(impl CookieSource + ?Sized),
) -> Option<CacheKey> {
    let token = session_token(cookies)?;
    Some(CacheKey::new(path, resolve_locale(cookies)).with_scope(token))
}

fn use_dashboard<T, F, Fut>(
    ctx: &FetchContext,
    cookies: &(impl CookieSource + ?Sized),
    path: impl Into<String>,
    options: FetchOptions,
    fetch: F,
) -> Resource<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(HttpClient, Locale, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ResponseEnvelope<T>> + Send + 'static,
{
    let key = session_key(path, cookies);
    let client = ctx.client.clone();
    use_cached_resource(&ctx.store, key, options, move |key: CacheKey| {
        let token = key.scope().unwrap_or_default().to_string();
        fetch(client.clone(), key.locale(), token)
    })
}

/// Save profile changes and refetch this session's cached profile.
pub async fn save_profile(
    ctx: &FetchContext,
    cookies: &(impl CookieSource + ?Sized),
    update: &ProfileUpdate,
) -> ResponseEnvelope<Profile> {
    let Some(token) = session_token(cookies) else {
        return ResponseEnvelope::no_response("not signed in");
    };
    let envelope = api::update_profile(&ctx.client, resolve_locale(cookies), &token, update).await;
    if envelope.is_success() {
        ctx.store.invalidate_scoped(paths::PROFILE, &token);
    }
    envelope
}

/// Remove a bookmark and refetch this session's saved-blog lists.
pub async fn unsave_blog(
    ctx: &FetchContext,
    cookies: &(impl CookieSource + ?Sized),
    blog_id: &str,
) -> ResponseEnvelope<()> {
    let Some(token) = session_token(cookies) else {
        return ResponseEnvelope::no_response("not signed in");
    };
    let envelope = api::remove_saved_blog(&ctx.client, &token, blog_id).await;
    if envelope.is_success() {
        ctx.store.invalidate_scoped(paths::SAVED_BLOGS, &token);
    }
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_surfaces_only_the_latest_resolution() {
        let ok = CacheEntry {
            outcome: Some(Ok(CachedValue::new(Some(vec![1_u8, 2])))),
            ..CacheEntry::default()
        };
        let state = ResourceState::<Vec<u8>>::from_entry(&ok);
        assert_eq!(state.data, Some(vec![1, 2]));
        assert!(state.error.is_none());

        let failed = CacheEntry {
            outcome: Some(Err(ApiError::new(500, "internal"))),
            ..CacheEntry::default()
        };
        let state = ResourceState::<Vec<u8>>::from_entry(&failed);
        assert!(state.data.is_none());
        assert_eq!(state.error.map(|err| err.message), Some("internal".to_string()));
    }

    #[test]
    fn loading_only_without_a_value() {
        let pending = CacheEntry {
            is_validating: true,
            ..CacheEntry::default()
        };
        assert!(ResourceState::<u8>::from_entry(&pending).is_loading);

        let revalidating = CacheEntry {
            outcome: Some(Ok(CachedValue::new(Some(3_u8)))),
            is_validating: true,
            ..CacheEntry::default()
        };
        let state = ResourceState::<u8>::from_entry(&revalidating);
        assert!(!state.is_loading);
        assert_eq!(state.data, Some(3));
    }

    #[test]
    fn type_mismatch_is_reported_as_error() {
        let entry = CacheEntry {
            outcome: Some(Ok(CachedValue::new(Some("text".to_string())))),
            ..CacheEntry::default()
        };
        let state = ResourceState::<u8>::from_entry(&entry);
        assert!(state.data.is_none());
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn null_key_never_fetches() {
        let store = CacheStore::new();
        let mut resource = use_cached_resource(
            &store,
            None,
            FetchOptions::immutable(),
            |_key: CacheKey| async { ResponseEnvelope::success(200, "ok", Some(1_u8)) },
        );
        assert_eq!(resource.state(), ResourceState::default());
        assert_eq!(resource.settled().await, ResourceState::default());
        assert_eq!(store.requests_started(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn switching_keys_drops_the_previous_view() {
        let store = CacheStore::new();
        let mut resource = use_cached_resource(
            &store,
            Some(CacheKey::new(paths::SECTION_LISTS, Locale::Zh)),
            FetchOptions::immutable(),
            |key: CacheKey| async move {
                ResponseEnvelope::success(200, "ok", Some(key.locale().to_string()))
            },
        );
        assert_eq!(resource.settled().await.data.as_deref(), Some("zh"));

        resource.set_key(Some(CacheKey::new(paths::SECTION_LISTS, Locale::En)));
        let state = resource.state();
        assert!(state.is_loading);
        assert!(state.data.is_none());
        assert_eq!(resource.settled().await.data.as_deref(), Some("en"));

        resource.set_key(None);
        assert_eq!(resource.state(), ResourceState::default());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_interval_polls_until_dropped() {
        let store = CacheStore::new();
        let key = CacheKey::new(paths::PAYMENTS, Locale::En);
        let options = FetchOptions::revalidating().with_refresh_interval(Duration::from_secs(10));
        let mut resource =
            use_cached_resource(&store, Some(key.clone()), options, |_key: CacheKey| async {
                ResponseEnvelope::success(200, "ok", Some(0_u8))
            });
        resource.settled().await;
        assert_eq!(store.requests_started(), 1);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(store.requests_started(), 3);

        drop(resource);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.requests_started(), 3);
    }
}
