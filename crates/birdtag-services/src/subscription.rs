//! Subscription registry
//!
//! Subscribing replaces the stored tag set for an email. Topic subscriptions
//! are attempted per tag and individual failures do not stop the rest; the
//! full tag set is persisted regardless.

use std::collections::BTreeSet;
use std::sync::Arc;

use birdtag_core::{AppError, Subscription};
use birdtag_db::SubscriptionStore;

use crate::notification::MessageBus;

#[derive(Debug)]
pub struct SubscribeOutcome {
    pub subscription: Subscription,
    /// Topics the email could not be subscribed to
    pub failed_topics: Vec<String>,
}

#[derive(Clone)]
pub struct SubscriptionRegistry {
    store: Arc<dyn SubscriptionStore>,
    bus: Arc<dyn MessageBus>,
    topic_prefix: String,
}

impl SubscriptionRegistry {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        bus: Arc<dyn MessageBus>,
        topic_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bus,
            topic_prefix: topic_prefix.into(),
        }
    }

    #[tracing::instrument(skip(self, email, tags), fields(tag_count = tags.len()))]
    pub async fn subscribe(
        &self,
        email: &str,
        tags: &[String],
    ) -> Result<SubscribeOutcome, AppError> {
        let subscription = Subscription::new(email, tags);
        if subscription.email.is_empty() {
            return Err(AppError::InvalidInput("Email is required".to_string()));
        }
        if !subscription.email.contains('@') {
            return Err(AppError::InvalidInput("Email address is invalid".to_string()));
        }
        if subscription.tags.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one tag is required".to_string(),
            ));
        }

        let mut failed_topics = Vec::new();
        for tag in &subscription.tags {
            let topic = format!("{}{}", self.topic_prefix, tag);
            if let Err(e) = self.bus.subscribe(&topic, &subscription.email).await {
                tracing::warn!(error = %e, topic = %topic, "Topic subscription failed");
                failed_topics.push(topic);
            }
        }

        self.store.put(&subscription).await?;

        tracing::info!(
            tag_count = subscription.tags.len(),
            failed_topics = failed_topics.len(),
            "Subscription stored"
        );

        Ok(SubscribeOutcome {
            subscription,
            failed_topics,
        })
    }

    /// Tags the email is subscribed to; empty when there is no subscription.
    pub async fn get(&self, email: &str) -> Result<BTreeSet<String>, AppError> {
        Ok(self
            .store
            .get(email.trim())
            .await?
            .map(|subscription| subscription.tags)
            .unwrap_or_default())
    }
}
