//! Shared constants/setters for things
//!

use std::sync::LazyLock;

/// Endpoint generation requests are POSTed to.
pub const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

/// URL prefix under which saved images are served back to the browser.
pub const IMAGE_URL_PREFIX: &str = "/static/images";

/// How many gallery entries the index page shows.
pub const GALLERY_LIMIT: usize = 24;

/// Max age (in seconds) for image cache entries.
pub const IMAGE_CACHE_MAX_AGE_SECONDS: u64 = 60 * 60;

/// Shared cache max age (in seconds) for image cache entries.
pub const IMAGE_CACHE_S_MAXAGE_SECONDS: u64 = 60 * 60 * 24;

/// Stale-while-revalidate window (in seconds) for image cache entries.
pub const IMAGE_CACHE_STALE_WHILE_REVALIDATE_SECONDS: u64 = 60 * 60 * 24;

/// Cache-Control value for image responses. Generated files are never
/// rewritten in place, so long cache windows are safe.
pub static IMAGE_CACHE_CONTROL: LazyLock<String> = LazyLock::new(|| {
    format!(
        "public, max-age={}, s-maxage={}, stale-while-revalidate={}",
        IMAGE_CACHE_MAX_AGE_SECONDS,
        IMAGE_CACHE_S_MAXAGE_SECONDS,
        IMAGE_CACHE_STALE_WHILE_REVALIDATE_SECONDS
    )
});
