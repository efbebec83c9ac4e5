use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::tags::normalize_tag;

/// A subscriber and the species they want to hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub email: String,
    pub tags: BTreeSet<String>,
}

impl Subscription {
    /// Builds a subscription with normalised, de-duplicated tag names.
    pub fn new<I, S>(email: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let email: String = email.into();
        Self {
            email: email.trim().to_string(),
            tags: tags
                .into_iter()
                .map(|t| normalize_tag(t.as_ref()))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}
