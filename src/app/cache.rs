use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::store::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ttl {
    For(Duration),
    /// Kept until the entry is cleared by hand.
    Forever,
}

impl Ttl {
    fn is_fresh(self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Forever => true,
            Self::For(ttl) => now.signed_duration_since(fetched_at) < ttl,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lookup<T> {
    Fresh(T),
    Refresh { stale: Option<T> },
}

/// Value handed to a screen. `error` is only set when nothing was cached and
/// the fetch failed; a stale fallback carries no error.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fetched<T> {
    pub(crate) value: T,
    pub(crate) error: Option<String>,
}

impl<T> Fetched<T> {
    pub(crate) fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CachedResource<T> {
    key: String,
    ttl: Ttl,
    default: T,
}

impl<T> CachedResource<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub(crate) fn new(key: impl Into<String>, ttl: Ttl, default: T) -> Self {
        Self {
            key: key.into(),
            ttl,
            default,
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    fn timestamp_key(&self) -> String {
        timestamp_key(&self.key)
    }

    pub(crate) fn lookup(&self, store: &dyn KeyValueStore, now: DateTime<Utc>) -> Lookup<T> {
        let Some((value, fetched_at)) = self.read_entry(store) else {
            return Lookup::Refresh { stale: None };
        };
        if self.ttl.is_fresh(fetched_at, now) {
            tracing::debug!(key = %self.key, "serving cached value");
            Lookup::Fresh(value)
        } else {
            Lookup::Refresh { stale: Some(value) }
        }
    }

    pub(crate) fn complete<E: Display>(
        &self,
        store: &dyn KeyValueStore,
        now: DateTime<Utc>,
        stale: Option<T>,
        result: Result<T, E>,
    ) -> Fetched<T> {
        match result {
            Ok(value) => {
                self.write_entry(store, &value, now);
                Fetched { value, error: None }
            }
            Err(err) => match stale {
                Some(value) => {
                    tracing::warn!(key = %self.key, %err, "refresh failed; serving stale cache");
                    Fetched { value, error: None }
                }
                None => {
                    tracing::warn!(
                        key = %self.key,
                        %err,
                        "fetch failed with no cache; using default"
                    );
                    Fetched {
                        value: self.default.clone(),
                        error: Some(err.to_string()),
                    }
                }
            },
        }
    }

    pub(crate) fn get_or_fetch<E, F>(&self, store: &dyn KeyValueStore, fetch: F) -> Fetched<T>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        self.get_or_fetch_at(store, Utc::now(), fetch)
    }

    pub(crate) fn get_or_fetch_at<E, F>(
        &self,
        store: &dyn KeyValueStore,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Fetched<T>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        match self.lookup(store, now) {
            Lookup::Fresh(value) => Fetched { value, error: None },
            Lookup::Refresh { stale } => self.complete(store, now, stale, fetch()),
        }
    }

    pub(crate) fn invalidate(&self, store: &dyn KeyValueStore) {
        invalidate_key(store, &self.key);
    }

    fn read_entry(&self, store: &dyn KeyValueStore) -> Option<(T, DateTime<Utc>)> {
        let raw = match store.get(&self.key) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(key = %self.key, %err, "cache read failed");
                return None;
            }
        };
        let value = match serde_json::from_str::<T>(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %self.key, %err, "cached value is corrupt; ignoring");
                return None;
            }
        };

        let fetched_at = store
            .get(&self.timestamp_key())
            .ok()
            .flatten()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        match (fetched_at, self.ttl) {
            (Some(fetched_at), _) => Some((value, fetched_at)),
            // Blobs cached before timestamps were written are still usable.
            (None, Ttl::Forever) => Some((value, DateTime::<Utc>::MIN_UTC)),
            (None, Ttl::For(_)) => None,
        }
    }

    fn write_entry(&self, store: &dyn KeyValueStore, value: &T, now: DateTime<Utc>) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(key = %self.key, %err, "failed to encode value for cache");
                return;
            }
        };
        if let Err(err) = store.set(&self.key, &encoded) {
            tracing::warn!(key = %self.key, %err, "failed to write cached value");
            return;
        }
        let stamp = now.timestamp_millis().to_string();
        if let Err(err) = store.set(&self.timestamp_key(), &stamp) {
            tracing::warn!(
                key = %self.key,
                %err,
                "cached value written but its timestamp was not; entry will refresh early"
            );
        }
    }
}

pub(crate) fn timestamp_key(key: &str) -> String {
    format!("{key}Timestamp")
}

pub(crate) fn invalidate_key(store: &dyn KeyValueStore, key: &str) {
    for entry in [key.to_string(), timestamp_key(key)] {
        if let Err(err) = store.remove(&entry) {
            tracing::warn!(key = %entry, %err, "failed to clear cache entry");
        }
    }
}
