use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::tags::TagMap;
use super::uri::StorageUri;

/// Short-lived result of an upload-and-match request, keyed by the sample upload's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientQueryResult {
    pub file_key: String,
    pub tags: TagMap,
    pub links: Vec<StorageUri>,
    pub expires_at: DateTime<Utc>,
}

impl TransientQueryResult {
    pub fn new(file_key: impl Into<String>, tags: TagMap, links: Vec<StorageUri>, ttl_secs: u64) -> Self {
        let ttl = Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000));
        Self {
            file_key: file_key.into(),
            tags,
            links,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let result = TransientQueryResult::new("uploads/sample.jpg", TagMap::new(), vec![], 300);
        assert!(!result.is_expired());
        assert!(result.is_expired_at(Utc::now() + Duration::seconds(301)));
    }
}
