use askama::Template;
use askama_web::WebTemplate;

use super::images::StoredImage;
use crate::constants::IMAGE_URL_PREFIX;

/// One entry in the index-page gallery.
#[derive(Clone, Debug)]
pub(crate) struct GalleryImage {
    pub(crate) url: String,
    pub(crate) saved_at: String,
}

impl From<StoredImage> for GalleryImage {
    fn from(image: StoredImage) -> Self {
        Self {
            url: format!("{IMAGE_URL_PREFIX}/{}", image.filename),
            saved_at: image
                .modified
                .map(|modified| modified.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) model: String,
    pub(crate) gallery: Vec<GalleryImage>,
}
