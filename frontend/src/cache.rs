//! Process-wide response cache with single-flight fetching.
//!
//! A [`CacheStore`] maps each [`CacheKey`] to one slot. A slot publishes its
//! [`CacheEntry`] through a `tokio::sync::watch` channel, so every reader sees
//! a whole entry and never a half-applied update. At most one request per key
//! is in flight; it runs as its own task and writes its outcome back into the
//! slot, independent of how many subscribers are still listening.
//!
//! Every started request gets a generation number. An outcome is applied only
//! when its generation is newer than the last applied one, so a slow request
//! can never overwrite the result of a newer one.

use std::{
    any::Any,
    collections::{hash_map::DefaultHasher, HashMap},
    fmt,
    hash::{Hash, Hasher},
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::{
    future::{self, BoxFuture},
    FutureExt,
};
use parking_lot::Mutex;
use tokio::{sync::watch, time::Instant};
use xiaoli_shared::{ApiError, Locale, NO_RESPONSE_STATUS};

/// Requests for the same key started within this window are served from the
/// cache instead of revalidating on mount.
pub const DEFAULT_DEDUPE_INTERVAL: Duration = Duration::from_secs(2);

/// Identity of a cacheable resource: endpoint path, locale and an optional
/// scope.
///
/// Keys that differ only in locale are unrelated entries. Resources that
/// depend on who is asking (dashboard data) carry the session as their
/// scope, so two sessions sharing one store never see each other's entries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    path: String,
    locale: Locale,
    scope: Option<String>,
}

impl CacheKey {
    /// Unscoped key for `path` in `locale`.
    pub fn new(path: impl Into<String>, locale: Locale) -> Self {
        Self {
            path: path.into(),
            locale,
            scope: None,
        }
    }

    /// Same key restricted to `scope`.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Endpoint path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Locale component.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Scope component, usually a session token.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    fn scope_digest(&self) -> Option<u64> {
        self.scope.as_ref().map(|scope| {
            let mut hasher = DefaultHasher::new();
            scope.hash(&mut hasher);
            hasher.finish()
        })
    }
}

// scope 可能是会话 token，日志里只输出摘要
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.locale)?;
        if let Some(digest) = self.scope_digest() {
            write!(f, "~{digest:016x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("path", &self.path)
            .field("locale", &self.locale)
            .field("scope", &self.scope_digest())
            .finish()
    }
}

/// When a cached entry is fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Fetch once per key; only manual invalidation refetches.
    Immutable,
    /// Serve cached data, then revalidate on mount and on the enabled
    /// triggers.
    Revalidating {
        /// Refetch on [`RevalidateEvent::Focus`].
        on_focus: bool,
        /// Refetch on [`RevalidateEvent::Reconnect`].
        on_reconnect: bool,
        /// Refetch periodically while subscribed.
        refresh_interval: Option<Duration>,
    },
}

impl FetchPolicy {
    /// Revalidating on focus and reconnect, without polling.
    pub const fn revalidating() -> Self {
        Self::Revalidating {
            on_focus: true,
            on_reconnect: true,
            refresh_interval: None,
        }
    }

    fn revalidates_on(&self, event: RevalidateEvent) -> bool {
        match (self, event) {
            (Self::Immutable, _) => false,
            (
                Self::Revalidating {
                    on_focus, ..
                },
                RevalidateEvent::Focus,
            ) => *on_focus,
            (
                Self::Revalidating {
                    on_reconnect, ..
                },
                RevalidateEvent::Reconnect,
            ) => *on_reconnect,
        }
    }

    /// Polling period, if any.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self {
            Self::Immutable => None,
            Self::Revalidating {
                refresh_interval, ..
            } => refresh_interval.filter(|period| !period.is_zero()),
        }
    }
}

/// Fetch configuration of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Revalidation policy.
    pub policy: FetchPolicy,
    /// Mount-time revalidation is skipped within this window.
    pub dedupe_interval: Duration,
}

impl FetchOptions {
    /// For data that practically never changes, such as site sections.
    pub const fn immutable() -> Self {
        Self {
            policy: FetchPolicy::Immutable,
            dedupe_interval: DEFAULT_DEDUPE_INTERVAL,
        }
    }

    /// Stale-while-revalidate defaults.
    pub const fn revalidating() -> Self {
        Self {
            policy: FetchPolicy::revalidating(),
            dedupe_interval: DEFAULT_DEDUPE_INTERVAL,
        }
    }

    /// Poll every `period` while subscribed. Turns an immutable policy into a
    /// revalidating one.
    pub fn with_refresh_interval(mut self, period: Duration) -> Self {
        self.policy = match self.policy {
            FetchPolicy::Immutable => FetchPolicy::Revalidating {
                on_focus: false,
                on_reconnect: false,
                refresh_interval: Some(period),
            },
            FetchPolicy::Revalidating {
                on_focus,
                on_reconnect,
                ..
            } => FetchPolicy::Revalidating {
                on_focus,
                on_reconnect,
                refresh_interval: Some(period),
            },
        };
        self
    }

    /// Replace the dedupe window.
    pub fn with_dedupe_interval(mut self, interval: Duration) -> Self {
        self.dedupe_interval = interval;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::revalidating()
    }
}

/// Environment events that may trigger revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidateEvent {
    /// The window regained focus.
    Focus,
    /// Network connectivity came back.
    Reconnect,
}

/// A type-erased cached payload.
#[derive(Clone)]
pub struct CachedValue(Arc<dyn Any + Send + Sync>);

impl CachedValue {
    /// Wrap a payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for CachedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CachedValue(..)")
    }
}

/// Result of one resolved request.
pub type Outcome = Result<CachedValue, ApiError>;

/// Snapshot of one key's cache state.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    /// Most recent resolution; a success clears the previous error and a
    /// failure replaces the previous value.
    pub outcome: Option<Outcome>,
    /// A request for the key is in flight.
    pub is_validating: bool,
    /// When `outcome` was last written.
    pub updated_at: Option<DateTime<Utc>>,
    /// Marked by invalidation until the next resolution lands.
    pub stale: bool,
}

impl CacheEntry {
    /// A successful resolution is cached.
    pub fn has_value(&self) -> bool {
        matches!(self.outcome, Some(Ok(_)))
    }

    /// Nothing usable is cached yet and a request is on its way.
    pub fn is_loading(&self) -> bool {
        !self.has_value() && self.is_validating
    }
}

/// Type-erased request factory registered by subscribers.
pub type Fetcher = Arc<dyn Fn(CacheKey) -> BoxFuture<'static, Outcome> + Send + Sync>;

struct Slot {
    entry: watch::Sender<CacheEntry>,
    fetcher: Option<Fetcher>,
    policy: FetchPolicy,
    generation: u64,
    applied_generation: u64,
    in_flight: Option<u64>,
    last_started: Option<Instant>,
}

impl Slot {
    fn new(policy: FetchPolicy) -> Self {
        let (entry, _) = watch::channel(CacheEntry::default());
        Self {
            entry,
            fetcher: None,
            policy,
            generation: 0,
            applied_generation: 0,
            in_flight: None,
            last_started: None,
        }
    }

    fn subscribers(&self) -> usize {
        self.entry.receiver_count()
    }
}

#[derive(Default)]
struct StoreInner {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    requests_started: AtomicU64,
}

/// Shared response cache.
///
/// Cloning is cheap and yields a handle to the same store. Create one per
/// process (or per test) and pass it to every hook. Entries live until
/// [`CacheStore::invalidate`], [`CacheStore::clear`] or the last handle is
/// dropped. Fetching spawns Tokio tasks, so subscriptions and triggers must
/// be issued from within a Tokio runtime.
#[derive(Clone, Default)]
pub struct CacheStore {
    inner: Arc<StoreInner>,
}

impl CacheStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entry for `key`, if the key was ever requested.
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner
            .slots
            .lock()
            .get(key)
            .map(|slot| slot.entry.borrow().clone())
    }

    /// Number of known keys.
    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    /// No key was requested yet, or all were cleared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total requests started by this store.
    pub fn requests_started(&self) -> u64 {
        self.inner.requests_started.load(Ordering::Relaxed)
    }

    /// Attach a subscriber to `key`, starting a request if the policy calls
    /// for one.
    ///
    /// The newest subscriber's fetcher and policy are used for later
    /// revalidations of the key.
    pub fn subscribe(
        &self,
        key: &CacheKey,
        options: &FetchOptions,
        fetcher: Fetcher,
    ) -> watch::Receiver<CacheEntry> {
        let mut slots = self.inner.slots.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(options.policy));
        slot.fetcher = Some(fetcher);
        slot.policy = options.policy;
        let receiver = slot.entry.subscribe();

        if should_fetch_on_mount(slot, options) {
            self.start_locked(key, slot);
        } else {
            tracing::trace!(key = %key, "served from cache");
        }
        receiver
    }

    /// Mark `key` stale and refetch it if anyone is subscribed, even when
    /// a request is already in flight. Honored under every policy.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut slots = self.inner.slots.lock();
        if let Some(slot) = slots.get_mut(key) {
            self.invalidate_locked(key, slot);
        }
    }

    /// Invalidate every key under `path`, in all locales and scopes.
    pub fn invalidate_path(&self, path: &str) {
        let mut slots = self.inner.slots.lock();
        for (key, slot) in slots.iter_mut().filter(|(key, _)| key.path() == path) {
            self.invalidate_locked(key, slot);
        }
    }

    /// Invalidate `path` for one scope only, in all locales.
    pub fn invalidate_scoped(&self, path: &str, scope: &str) {
        let mut slots = self.inner.slots.lock();
        for (key, slot) in slots
            .iter_mut()
            .filter(|(key, _)| key.path() == path && key.scope() == Some(scope))
        {
            self.invalidate_locked(key, slot);
        }
    }

    /// Refetch `key` unless a request is already in flight or nobody is
    /// subscribed.
    pub fn revalidate(&self, key: &CacheKey) -> bool {
        let mut slots = self.inner.slots.lock();
        match slots.get_mut(key) {
            Some(slot) if slot.in_flight.is_none() && slot.subscribers() > 0 => {
                self.start_locked(key, slot)
            },
            _ => false,
        }
    }

    /// Revalidate every subscribed key whose policy reacts to `event`.
    /// Returns how many requests were started.
    pub fn revalidate_on(&self, event: RevalidateEvent) -> usize {
        let mut slots = self.inner.slots.lock();
        let mut started = 0;
        for (key, slot) in slots.iter_mut() {
            if slot.in_flight.is_none()
                && slot.subscribers() > 0
                && slot.policy.revalidates_on(event)
                && self.start_locked(key, slot)
            {
                started += 1;
            }
        }
        tracing::debug!(?event, started, "revalidation triggered");
        started
    }

    /// Drop every entry. Keys that still have subscribers are reset and
    /// refetched; outcomes of requests started before the clear are ignored.
    pub fn clear(&self) {
        let mut slots = self.inner.slots.lock();
        slots.retain(|_, slot| slot.subscribers() > 0);
        for (key, slot) in slots.iter_mut() {
            slot.applied_generation = slot.generation;
            slot.in_flight = None;
            slot.entry.send_replace(CacheEntry::default());
            self.start_locked(key, slot);
        }
        tracing::debug!(live = slots.len(), "cache cleared");
    }

    fn invalidate_locked(&self, key: &CacheKey, slot: &mut Slot) {
        slot.entry.send_modify(|entry| entry.stale = true);
        if slot.subscribers() > 0 {
            self.start_locked(key, slot);
        }
        tracing::debug!(key = %key, "cache entry invalidated");
    }

    fn start_locked(&self, key: &CacheKey, slot: &mut Slot) -> bool {
        let Some(fetcher) = slot.fetcher.clone() else {
            return false;
        };
        slot.generation += 1;
        let generation = slot.generation;
        slot.in_flight = Some(generation);
        slot.last_started = Some(Instant::now());
        slot.entry.send_modify(|entry| entry.is_validating = true);
        self.inner.requests_started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, generation, "starting request");

        let store = Arc::downgrade(&self.inner);
        let key = key.clone();
        // fetcher 在任务里首次 poll 时才调用，此时不持有锁
        let request_key = key.clone();
        let request = AssertUnwindSafe(future::lazy(move |_| fetcher(request_key)).flatten())
            .catch_unwind();
        tokio::spawn(async move {
            let outcome = request.await.unwrap_or_else(|_| {
                tracing::error!(key = %key, "fetcher panicked");
                Err(ApiError::new(NO_RESPONSE_STATUS, "request aborted unexpectedly"))
            });
            apply_outcome(&store, &key, generation, outcome);
        });
        true
    }
}

fn should_fetch_on_mount(slot: &Slot, options: &FetchOptions) -> bool {
    if slot.in_flight.is_some() {
        return false;
    }
    let entry = slot.entry.borrow();
    if !entry.has_value() || entry.stale {
        return true;
    }
    match options.policy {
        FetchPolicy::Immutable => false,
        FetchPolicy::Revalidating { .. } => slot
            .last_started
            .map_or(true, |started| started.elapsed() >= options.dedupe_interval),
    }
}

fn apply_outcome(store: &Weak<StoreInner>, key: &CacheKey, generation: u64, outcome: Outcome) {
    let Some(inner) = store.upgrade() else {
        return;
    };
    let mut slots = inner.slots.lock();
    let Some(slot) = slots.get_mut(key) else {
        tracing::trace!(key = %key, generation, "entry cleared before response arrived");
        return;
    };
    if slot.in_flight == Some(generation) {
        slot.in_flight = None;
    }
    let validating = slot.in_flight.is_some();

    if generation <= slot.applied_generation {
        tracing::debug!(
            key = %key,
            generation,
            applied = slot.applied_generation,
            "discarding superseded response"
        );
        slot.entry.send_if_modified(|entry| {
            let changed = entry.is_validating != validating;
            entry.is_validating = validating;
            changed
        });
        return;
    }

    slot.applied_generation = generation;
    if let Err(err) = &outcome {
        tracing::debug!(
            key = %key,
            generation,
            status = err.status,
            error = %err,
            "request failed"
        );
    }
    slot.entry.send_modify(|entry| {
        entry.outcome = Some(outcome);
        entry.is_validating = validating;
        entry.updated_at = Some(Utc::now());
        entry.stale = false;
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_fetcher(calls: Arc<AtomicUsize>, delay: Duration) -> Fetcher {
        Arc::new(move |key: CacheKey| -> BoxFuture<'static, Outcome> {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(delay).await;
                Ok(CachedValue::new(format!("{key}@{n}")))
            }
            .boxed()
        })
    }

    async fn settle(receiver: &mut watch::Receiver<CacheEntry>) -> CacheEntry {
        receiver
            .wait_for(|entry| !entry.is_validating)
            .await
            .expect("store alive")
            .clone()
    }

    fn text(entry: &CacheEntry) -> Option<String> {
        match &entry.outcome {
            Some(Ok(value)) => value.downcast_ref::<String>().cloned(),
            _ => None,
        }
    }

    #[tokio::test]
    async fn concurrent_subscribers_share_one_request() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("/section/get-section-lists", Locale::Zh);
        let options = FetchOptions::immutable();

        let delay = Duration::from_millis(50);
        let mut first = store.subscribe(&key, &options, counting_fetcher(calls.clone(), delay));
        let mut second = store.subscribe(&key, &options, counting_fetcher(calls.clone(), delay));
        assert!(first.borrow().is_loading());
        assert!(second.borrow().is_loading());

        let a = settle(&mut first).await;
        let b = settle(&mut second).await;
        assert_eq!(text(&a), text(&b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.requests_started(), 1);
    }

    #[tokio::test]
    async fn immutable_entries_are_not_refetched_on_mount_or_focus() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("/section/get-section-lists", Locale::En);
        let options = FetchOptions::immutable().with_dedupe_interval(Duration::ZERO);

        let mut first =
            store.subscribe(&key, &options, counting_fetcher(calls.clone(), Duration::ZERO));
        settle(&mut first).await;
        let second =
            store.subscribe(&key, &options, counting_fetcher(calls.clone(), Duration::ZERO));
        assert!(second.borrow().has_value());
        assert_eq!(store.revalidate_on(RevalidateEvent::Focus), 0);
        assert_eq!(store.revalidate_on(RevalidateEvent::Reconnect), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.invalidate(&key);
        let refreshed = settle(&mut first).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!refreshed.stale);
    }

    #[tokio::test]
    async fn revalidating_entries_refetch_on_focus_and_after_dedupe_window() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("/blog/saved", Locale::En);
        let options = FetchOptions::revalidating().with_dedupe_interval(Duration::ZERO);

        let mut receiver =
            store.subscribe(&key, &options, counting_fetcher(calls.clone(), Duration::ZERO));
        settle(&mut receiver).await;

        assert_eq!(store.revalidate_on(RevalidateEvent::Focus), 1);
        let after_focus = settle(&mut receiver).await;
        assert_eq!(text(&after_focus), Some("/blog/saved#en@2".to_string()));

        let _remount =
            store.subscribe(&key, &options, counting_fetcher(calls.clone(), Duration::ZERO));
        settle(&mut receiver).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn locales_are_independent_entries() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let zh = CacheKey::new("/section/get-section-lists", Locale::Zh);
        let en = CacheKey::new("/section/get-section-lists", Locale::En);

        let mut receiver = store.subscribe(
            &zh,
            &FetchOptions::immutable(),
            counting_fetcher(calls.clone(), Duration::ZERO),
        );
        settle(&mut receiver).await;

        assert!(store.entry(&zh).is_some_and(|entry| entry.has_value()));
        assert!(store.entry(&en).is_none());
    }

    #[tokio::test]
    async fn stale_generation_does_not_overwrite_newer_result() {
        let store = CacheStore::new();
        let key = CacheKey::new("/payment/list", Locale::En);
        let calls = Arc::new(AtomicUsize::new(0));
        // First request is slow, the invalidation-triggered second one is fast.
        let fetcher: Fetcher = {
            let calls = calls.clone();
            Arc::new(move |_key: CacheKey| -> BoxFuture<'static, Outcome> {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    let delay = if n == 1 { 200 } else { 10 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(CachedValue::new(format!("response-{n}")))
                }
                .boxed()
            })
        };

        let mut receiver = store.subscribe(&key, &FetchOptions::revalidating(), fetcher);
        store.invalidate(&key);

        let fast = receiver
            .wait_for(|entry| entry.has_value())
            .await
            .expect("alive")
            .clone();
        assert_eq!(text(&fast), Some("response-2".to_string()));

        tokio::time::sleep(Duration::from_millis(300)).await;
        let entry = store.entry(&key).expect("entry");
        assert_eq!(text(&entry), Some("response-2".to_string()));
        assert!(!entry.is_validating);
    }

    #[tokio::test]
    async fn failure_replaces_value_and_is_not_loading() {
        let store = CacheStore::new();
        let key = CacheKey::new("/user/profile", Locale::Zh);
        let fetcher: Fetcher = Arc::new(|_key: CacheKey| -> BoxFuture<'static, Outcome> {
            async { Err(ApiError::new(500, "internal")) }.boxed()
        });

        let mut receiver = store.subscribe(&key, &FetchOptions::revalidating(), fetcher);
        let entry = settle(&mut receiver).await;
        assert!(!entry.is_loading());
        assert!(matches!(&entry.outcome, Some(Err(err)) if err.message == "internal"));
    }

    #[tokio::test]
    async fn panicking_fetcher_resolves_to_error() {
        let store = CacheStore::new();
        let key = CacheKey::new("/user/profile", Locale::En);
        let fetcher: Fetcher = Arc::new(|_key: CacheKey| -> BoxFuture<'static, Outcome> {
            async { panic!("boom") }.boxed()
        });

        let mut receiver = store.subscribe(&key, &FetchOptions::immutable(), fetcher);
        let entry = settle(&mut receiver).await;
        assert!(matches!(&entry.outcome, Some(Err(err)) if err.is_transport()));
    }

    #[tokio::test]
    async fn clear_drops_unsubscribed_keys_and_refetches_live_ones() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let live = CacheKey::new("/blog/saved", Locale::Zh);
        let gone = CacheKey::new("/payment/list", Locale::Zh);

        let mut receiver = store.subscribe(
            &live,
            &FetchOptions::immutable(),
            counting_fetcher(calls.clone(), Duration::ZERO),
        );
        {
            let mut dropped = store.subscribe(
                &gone,
                &FetchOptions::immutable(),
                counting_fetcher(calls.clone(), Duration::ZERO),
            );
            settle(&mut dropped).await;
        }
        settle(&mut receiver).await;

        store.clear();
        assert_eq!(store.len(), 1);
        assert!(store.entry(&gone).is_none());
        let refetched = settle(&mut receiver).await;
        assert!(refetched.has_value());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fetcher_may_use_the_store_and_panic_synchronously() {
        let store = CacheStore::new();
        let key = CacheKey::new("/blog/saved", Locale::Zh);
        let reentrant: Fetcher = {
            let store = store.clone();
            Arc::new(move |key: CacheKey| -> BoxFuture<'static, Outcome> {
                let known = store.len();
                async move { Ok(CachedValue::new(format!("{key} of {known}"))) }.boxed()
            })
        };
        let mut receiver = store.subscribe(&key, &FetchOptions::immutable(), reentrant);
        let entry = settle(&mut receiver).await;
        assert_eq!(text(&entry), Some("/blog/saved#zh of 1".to_string()));

        let other = CacheKey::new("/payment/list", Locale::Zh);
        let panicking: Fetcher =
            Arc::new(|_key: CacheKey| -> BoxFuture<'static, Outcome> { panic!("no future") });
        let mut receiver = store.subscribe(&other, &FetchOptions::immutable(), panicking);
        let entry = settle(&mut receiver).await;
        assert!(matches!(&entry.outcome, Some(Err(err)) if err.is_transport()));
    }

    #[tokio::test]
    async fn scoped_keys_are_separate_entries() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let alice = CacheKey::new("/user/profile", Locale::En).with_scope("alice-token");
        let bob = CacheKey::new("/user/profile", Locale::En).with_scope("bob-token");
        assert_ne!(alice, bob);
        assert!(!alice.to_string().contains("alice-token"));

        let options = FetchOptions::revalidating();
        let mut a =
            store.subscribe(&alice, &options, counting_fetcher(calls.clone(), Duration::ZERO));
        let mut b =
            store.subscribe(&bob, &options, counting_fetcher(calls.clone(), Duration::ZERO));
        settle(&mut a).await;
        settle(&mut b).await;
        assert_eq!(store.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        store.invalidate_scoped("/user/profile", "alice-token");
        settle(&mut a).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        store.invalidate_path("/user/profile");
        settle(&mut a).await;
        settle(&mut b).await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
