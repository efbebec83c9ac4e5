use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::tags::TagMap;
use super::uri::StorageUri;

/// Kind of media an asset holds, decided by its file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_file_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Video,
    Audio,
}

impl FileType {
    /// Maps a lowercase or mixed-case extension (without the dot) to a file type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" => Some(FileType::Image),
            "mp4" | "avi" | "mov" => Some(FileType::Video),
            "wav" | "flac" | "mp3" => Some(FileType::Audio),
            _ => None,
        }
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileType::Image => write!(f, "image"),
            FileType::Video => write!(f, "video"),
            FileType::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for FileType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(FileType::Image),
            "video" => Ok(FileType::Video),
            "audio" => Ok(FileType::Audio),
            _ => Err(anyhow::anyhow!("Invalid file type: {}", s)),
        }
    }
}

/// One indexed media asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub file_id: String,
    pub file_type: FileType,
    pub original_address: StorageUri,
    pub thumbnail_address: Option<StorageUri>,
    pub tags: TagMap,
}

impl MediaRecord {
    /// Address shown in query results: the thumbnail for images that have one,
    /// the original otherwise.
    pub fn display_address(&self) -> &StorageUri {
        match (&self.thumbnail_address, self.file_type) {
            (Some(thumbnail), FileType::Image) => thumbnail,
            _ => &self.original_address,
        }
    }

    pub fn has_address(&self, uri: &StorageUri) -> bool {
        &self.original_address == uri || self.thumbnail_address.as_ref() == Some(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file_type: FileType, thumbnail: Option<&str>) -> MediaRecord {
        MediaRecord {
            file_id: "crow.jpg".to_string(),
            file_type,
            original_address: StorageUri::new("media", "crow.jpg"),
            thumbnail_address: thumbnail.map(|k| StorageUri::new("media", k)),
            tags: TagMap::new(),
        }
    }

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_extension("JPEG"), Some(FileType::Image));
        assert_eq!(FileType::from_extension("mov"), Some(FileType::Video));
        assert_eq!(FileType::from_extension("flac"), Some(FileType::Audio));
        assert_eq!(FileType::from_extension("gif"), None);
    }

    #[test]
    fn test_display_address_prefers_image_thumbnail() {
        let with_thumb = record(FileType::Image, Some("thumbnails/crow-thumb.jpg"));
        assert_eq!(with_thumb.display_address().key, "thumbnails/crow-thumb.jpg");

        let without_thumb = record(FileType::Image, None);
        assert_eq!(without_thumb.display_address().key, "crow.jpg");

        let video = record(FileType::Video, Some("thumbnails/crow-thumb.jpg"));
        assert_eq!(video.display_address().key, "crow.jpg");
    }

    #[test]
    fn test_has_address() {
        let rec = record(FileType::Image, Some("thumbnails/crow-thumb.jpg"));
        assert!(rec.has_address(&StorageUri::new("media", "thumbnails/crow-thumb.jpg")));
        assert!(rec.has_address(&StorageUri::new("media", "crow.jpg")));
        assert!(!rec.has_address(&StorageUri::new("other", "crow.jpg")));
    }
}
