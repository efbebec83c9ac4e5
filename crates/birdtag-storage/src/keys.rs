//! Thumbnail key convention shared by ingestion and deletion.
//!
//! Key format: the thumbnail of `{dir}/{stem}.{ext}` lives in the same bucket at
//! `{prefix}{stem}{suffix}.jpg`.

use birdtag_core::StorageUri;

const THUMBNAIL_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailNaming {
    prefix: String,
    suffix: String,
}

impl ThumbnailNaming {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Conventional thumbnail location for an original object.
    pub fn thumbnail_for(&self, original: &StorageUri) -> StorageUri {
        original.with_key(format!(
            "{}{}{}.{}",
            self.prefix,
            original.stem(),
            self.suffix,
            THUMBNAIL_EXTENSION
        ))
    }

    /// Stem of the original an address names, if the address follows the thumbnail convention.
    pub fn original_stem<'a>(&self, thumbnail: &'a StorageUri) -> Option<&'a str> {
        let rest = thumbnail.key.strip_prefix(self.prefix.as_str())?;
        let extension = format!(".{}", THUMBNAIL_EXTENSION);
        let name = rest.strip_suffix(extension.as_str())?;
        let stem = name.strip_suffix(self.suffix.as_str())?;
        if stem.is_empty() || stem.contains('/') {
            return None;
        }
        Some(stem)
    }
}

impl Default for ThumbnailNaming {
    fn default() -> Self {
        Self::new("thumbnails/", "-thumb")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_for() {
        let naming = ThumbnailNaming::default();
        let original = StorageUri::new("media", "uploads/crow.png");
        assert_eq!(
            naming.thumbnail_for(&original),
            StorageUri::new("media", "thumbnails/crow-thumb.jpg")
        );
    }

    #[test]
    fn test_original_stem() {
        let naming = ThumbnailNaming::default();
        let thumb = StorageUri::new("media", "thumbnails/crow-thumb.jpg");
        assert_eq!(naming.original_stem(&thumb), Some("crow"));

        assert_eq!(naming.original_stem(&StorageUri::new("media", "crow.jpg")), None);
        assert_eq!(
            naming.original_stem(&StorageUri::new("media", "thumbnails/crow.jpg")),
            None
        );
    }
}
