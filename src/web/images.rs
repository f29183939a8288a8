//! On-disk handling of generated images: naming, persistence, and the
//! cache-aware handler that serves them back to the browser.

use std::io::ErrorKind;
use std::path::{Path as StdPath, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use axum::http::response::Builder;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose;
use chrono::{DateTime, Utc};
use httpdate::{fmt_http_date, parse_http_date};
use tracing::warn;

use super::AppState;
use crate::constants::{IMAGE_CACHE_CONTROL, IMAGE_URL_PREFIX};
use crate::error::ImgenError;
use crate::openai::{ImageData, OutputFormat};

/// Builds the filename for one image of a batch:
/// `generated_<index>_<unixSeconds>.<ext>`.
fn generated_filename(index: usize, format: OutputFormat) -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("generated_{index}_{ts}.{}", format.extension())
}

/// Decodes each API payload and writes it under `image_dir`, returning the
/// web paths in response order.
///
/// The batch is all-or-nothing: when any payload fails to decode or write,
/// files this call already produced are removed again and the whole call
/// reports the failure.
pub(crate) async fn save_images(
    image_dir: &StdPath,
    data: &[ImageData],
    format: OutputFormat,
) -> Result<Vec<String>, ImgenError> {
    tokio::fs::create_dir_all(image_dir).await?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(data.len());
    let mut urls = Vec::with_capacity(data.len());

    for (index, image) in data.iter().enumerate() {
        match save_one(image_dir, index, image, format).await {
            Ok((path, url)) => {
                written.push(path);
                urls.push(url);
            }
            Err(err) => {
                remove_written(&written).await;
                return Err(err);
            }
        }
    }

    Ok(urls)
}

async fn save_one(
    image_dir: &StdPath,
    index: usize,
    image: &ImageData,
    format: OutputFormat,
) -> Result<(PathBuf, String), ImgenError> {
    let Some(b64_json) = image.b64_json.as_deref() else {
        return Err(ImgenError::Decode(format!(
            "image {index} has no b64_json payload"
        )));
    };

    let bytes = general_purpose::STANDARD
        .decode(b64_json)
        .map_err(|err| ImgenError::Decode(format!("image {index}: {err}")))?;

    // The bytes are written either way; the sniff only flags responses that
    // clearly aren't images.
    if let Err(err) = image::guess_format(&bytes) {
        warn!("Image {index} payload does not sniff as a known image format: {err}");
    }

    let filename = generated_filename(index, format);
    let path = image_dir.join(&filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|err| ImgenError::Io(format!("image {index}: {err}")))?;

    Ok((path, format!("{IMAGE_URL_PREFIX}/{filename}")))
}

async fn remove_written(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = tokio::fs::remove_file(path).await {
            warn!("Failed to clean up {} after batch failure: {err}", path.display());
        }
    }
}

/// A previously generated image found on disk.
#[derive(Clone, Debug)]
pub(crate) struct StoredImage {
    pub(crate) filename: String,
    pub(crate) modified: Option<DateTime<Utc>>,
}

/// Lists saved images, newest first. A missing directory is an empty gallery,
/// not an error.
pub(crate) async fn list_generated_images(
    image_dir: &StdPath,
) -> Result<Vec<StoredImage>, ImgenError> {
    let mut entries = match tokio::fs::read_dir(image_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(ImgenError::Io(err.to_string())),
    };

    let mut images = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| ImgenError::Io(err.to_string()))?
    {
        let path = entry.path();
        let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if content_type_for(filename).is_none() {
            continue;
        }
        let modified = entry
            .metadata()
            .await
            .ok()
            .and_then(|metadata| metadata.modified().ok())
            .map(DateTime::<Utc>::from);
        images.push(StoredImage {
            filename: filename.to_string(),
            modified,
        });
    }

    images.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(images)
}

/// Content type for a saved image, judged by extension. `None` means the file
/// is not something this app serves.
pub(crate) fn content_type_for(filename: &str) -> Option<&'static str> {
    let extension = filename.rsplit_once('.')?.1;
    match extension {
        "png" => Some("image/png"),
        "jpeg" | "jpg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

// Route parameters never contain `/`, but encoded separators and dotfiles
// still have to be kept out of the image directory lookup.
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// GET handler for `/static/images/{filename}`.
pub(crate) async fn image_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ImgenError> {
    if !is_safe_filename(&filename) {
        return Err(ImgenError::NotFound(filename));
    }
    let Some(content_type) = content_type_for(&filename) else {
        return Err(ImgenError::NotFound(filename));
    };

    let path = state.image_dir.join(&filename);
    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(ImgenError::NotFound(filename)),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ImgenError::NotFound(filename));
        }
        Err(err) => return Err(ImgenError::Io(err.to_string())),
    };

    let cache = ImageCacheHeaders::from_metadata(&metadata);
    if cache.not_modified(&headers) {
        return cache.not_modified_response();
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|err| ImgenError::Io(err.to_string()))?;
    let builder = cache.apply(
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type),
    );
    builder.body(Body::from(bytes)).map_err(ImgenError::from)
}

/// Cache headers derived from image file metadata.
#[derive(Clone, Debug)]
pub(crate) struct ImageCacheHeaders {
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
    modified_at: Option<SystemTime>,
}

impl ImageCacheHeaders {
    /// Builds cache headers from filesystem metadata.
    pub(crate) fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified_at = metadata.modified().ok();
        Self {
            etag: etag_value(metadata.len(), modified_at),
            last_modified: modified_at
                .and_then(|modified| HeaderValue::from_str(&fmt_http_date(modified)).ok()),
            modified_at,
        }
    }

    /// Adds Cache-Control, ETag and Last-Modified to a response builder.
    pub(crate) fn apply(&self, mut builder: Builder) -> Builder {
        builder = builder.header(CACHE_CONTROL, IMAGE_CACHE_CONTROL.as_str());
        if let Some(etag) = &self.etag {
            builder = builder.header(ETAG, etag.clone());
        }
        if let Some(last_modified) = &self.last_modified {
            builder = builder.header(LAST_MODIFIED, last_modified.clone());
        }
        builder
    }

    /// Returns true when the request's conditional headers match the file as
    /// it stands.
    pub(crate) fn not_modified(&self, headers: &HeaderMap) -> bool {
        if let Some(if_none_match) = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
            let if_none_match = if_none_match.trim();
            if if_none_match == "*" {
                return true;
            }
            let Some(etag) = self.etag.as_ref().and_then(|v| v.to_str().ok()) else {
                return false;
            };
            return if_none_match
                .split(',')
                .any(|candidate| candidate.trim() == etag);
        }

        if let (Some(since), Some(modified_at)) =
            (headers.get(IF_MODIFIED_SINCE), self.modified_at)
            && let Ok(since) = since.to_str()
            && let Ok(since) = parse_http_date(since)
        {
            return modified_at <= since;
        }

        false
    }

    /// Builds a 304 response that keeps the cache headers.
    pub(crate) fn not_modified_response(&self) -> Result<Response, ImgenError> {
        self.apply(Response::builder().status(StatusCode::NOT_MODIFIED))
            .body(Body::empty())
            .map_err(ImgenError::from)
    }
}

fn etag_value(size: u64, modified_at: Option<SystemTime>) -> Option<HeaderValue> {
    let modified = modified_at?
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    HeaderValue::from_str(&format!("W/\"{size}-{modified}\"")).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::openai::ImageData;

    fn payload(b64_json: Option<&str>) -> ImageData {
        ImageData {
            b64_json: b64_json.map(str::to_string),
            url: None,
            revised_prompt: None,
        }
    }

    #[test]
    fn filename_encodes_index_timestamp_and_extension() {
        let filename = generated_filename(3, OutputFormat::Webp);
        let rest = filename
            .strip_prefix("generated_3_")
            .expect("index prefix");
        let ts = rest.strip_suffix(".webp").expect("extension suffix");
        assert!(ts.parse::<u64>().is_ok(), "timestamp segment: {ts}");
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.png"), Some("image/png"));
        assert_eq!(content_type_for("a.jpeg"), Some("image/jpeg"));
        assert_eq!(content_type_for("a.webp"), Some("image/webp"));
        assert_eq!(content_type_for("a.txt"), None);
        assert_eq!(content_type_for("noextension"), None);
    }

    #[test]
    fn unsafe_filenames_rejected() {
        assert!(is_safe_filename("generated_0_1700000000.png"));
        assert!(!is_safe_filename(".hidden"));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename("..%2Fb.png"));
        assert!(!is_safe_filename(""));
    }

    #[tokio::test]
    async fn save_round_trips_known_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bytes = b"not really an image, but bytes are bytes";
        let encoded = general_purpose::STANDARD.encode(bytes);

        let urls = save_images(dir.path(), &[payload(Some(&encoded))], OutputFormat::Png)
            .await
            .expect("save");

        assert_eq!(urls.len(), 1);
        let filename = urls[0]
            .strip_prefix("/static/images/")
            .expect("url prefix");
        let on_disk = std::fs::read(dir.path().join(filename)).expect("read back");
        assert_eq!(on_disk, bytes);
    }

    #[tokio::test]
    async fn failed_batch_removes_already_written_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = general_purpose::STANDARD.encode(b"first image");
        let batch = [payload(Some(&good)), payload(Some("!!! not base64 !!!"))];

        let err = save_images(dir.path(), &batch, OutputFormat::Png)
            .await
            .expect_err("second payload is bad");
        assert!(err.to_string().contains("image 1"), "got: {err}");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .collect();
        assert!(leftovers.is_empty(), "batch should have been rolled back");
    }

    #[tokio::test]
    async fn missing_payload_is_a_decode_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = save_images(dir.path(), &[payload(None)], OutputFormat::Png)
            .await
            .expect_err("no payload");
        assert!(matches!(err, ImgenError::Decode(_)));
    }

    #[tokio::test]
    async fn listing_skips_unknown_files_and_missing_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("generated_0_1700000000.png"), b"png").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let images = list_generated_images(dir.path()).await.expect("list");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, "generated_0_1700000000.png");

        let images = list_generated_images(&dir.path().join("missing"))
            .await
            .expect("missing dir is empty");
        assert!(images.is_empty());
    }

    #[test]
    fn etag_and_not_modified_checks() {
        let now = SystemTime::now();
        let cache = ImageCacheHeaders {
            etag: etag_value(42, Some(now)),
            last_modified: HeaderValue::from_str(&fmt_http_date(now)).ok(),
            modified_at: Some(now),
        };

        let etag = cache.etag.clone().expect("etag");
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, etag);
        assert!(cache.not_modified(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("W/\"other\""));
        assert!(!cache.not_modified(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_str(&fmt_http_date(now + std::time::Duration::from_secs(60)))
                .unwrap(),
        );
        assert!(cache.not_modified(&headers));
    }
}
