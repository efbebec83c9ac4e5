use async_trait::async_trait;
use birdtag_core::{AppError, FileType, StorageUri, TagMap};
use std::sync::Mutex;

use crate::detector::SpeciesDetector;

/// Detector that answers every request with the same preset tags
#[derive(Default)]
pub struct StaticDetector {
    tags: Mutex<TagMap>,
    failure: Mutex<Option<String>>,
}

impl StaticDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tags(&self, tags: &[(&str, i64)]) {
        *self.tags.lock().unwrap() =
            birdtag_core::models::tags::tag_map_from_counts(tags.iter().copied());
    }

    /// Make every detection fail with `message`
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl SpeciesDetector for StaticDetector {
    async fn detect(&self, _location: &StorageUri, _file_type: FileType) -> Result<TagMap, AppError> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(AppError::Detection(message));
        }
        Ok(self.tags.lock().unwrap().clone())
    }
}
