use std::fmt::Display;

use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};

use crate::store::KeyValueStore;

use super::api::ApiClient;
use super::cache::{CachedResource, Fetched, Lookup, Ttl};

pub(crate) const LIST_IMAGE_KEY: &str = "cachedListImage";
pub(crate) const SONGS_IMAGE_KEY: &str = "cachedSongsImage";

/// Images rarely change, so they stay cached until cleared by hand.
pub(crate) fn image_cache(key: &str) -> CachedResource<String> {
    CachedResource::new(key, Ttl::Forever, String::new())
}

pub(crate) fn cached_image(
    store: &dyn KeyValueStore,
    client: &ApiClient,
    key: &str,
    url: &str,
    refresh: bool,
) -> Fetched<String> {
    let fetch = || client.blob(url).map(|bytes| to_data_url(&bytes, url));
    refresh_image(&image_cache(key), store, Utc::now(), refresh, fetch)
}

/// A forced refresh still keeps the cached image as the fallback.
fn refresh_image<E, F>(
    cache: &CachedResource<String>,
    store: &dyn KeyValueStore,
    now: DateTime<Utc>,
    refresh: bool,
    fetch: F,
) -> Fetched<String>
where
    E: Display,
    F: FnOnce() -> Result<String, E>,
{
    if !refresh {
        return cache.get_or_fetch_at(store, now, fetch);
    }
    let stale = match cache.lookup(store, now) {
        Lookup::Fresh(value) => Some(value),
        Lookup::Refresh { stale } => stale,
    };
    cache.complete(store, now, stale, fetch())
}

pub(crate) fn sniff_mime(bytes: &[u8], url: &str) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return "image/png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return "image/webp";
    }
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    if path.ends_with(".svg") {
        "image/svg+xml"
    } else if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else if path.ends_with(".png") {
        "image/png"
    } else {
        "application/octet-stream"
    }
}

pub(crate) fn to_data_url(bytes: &[u8], url: &str) -> String {
    format!("data:{};base64,{}", sniff_mime(bytes, url), STANDARD.encode(bytes))
}

pub(crate) fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| anyhow!("not a data URL"))?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(anyhow!("unsupported data URL header '{header}'"));
    }
    STANDARD
        .decode(payload)
        .context("data URL payload is not valid base64")
}
