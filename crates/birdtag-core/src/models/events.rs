use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::record::MediaRecord;
use super::tags::TagMap;
use super::uri::StorageUri;

/// What happened to the record that produced a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    #[default]
    Modify,
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ChangeKind::Insert => write!(f, "INSERT"),
            ChangeKind::Modify => write!(f, "MODIFY"),
        }
    }
}

/// Post-mutation snapshot of a record, delivered to the notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default)]
    pub kind: ChangeKind,
    pub record_id: String,
    pub tags: TagMap,
    pub original_address: StorageUri,
}

impl ChangeEvent {
    pub fn from_record(kind: ChangeKind, record: &MediaRecord) -> Self {
        Self {
            kind,
            record_id: record.file_id.clone(),
            tags: record.tags.clone(),
            original_address: record.original_address.clone(),
        }
    }
}
