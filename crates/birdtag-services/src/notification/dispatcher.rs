use std::collections::BTreeSet;
use std::sync::Arc;

use birdtag_core::models::tags::normalize_tag;
use birdtag_core::{AppError, ChangeEvent};
use birdtag_db::SubscriptionStore;
use birdtag_storage::AddressNormalizer;

use super::bus::{MessageBus, Notification};

/// Outcome of dispatching one change event
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub sent: usize,
    /// (email, tag, error) for each publish that failed
    pub failed: Vec<(String, String, AppError)>,
}

/// Fans out one change event to every subscriber whose tags intersect the
/// event's detected tags.
#[derive(Clone)]
pub struct NotificationDispatcher {
    subscriptions: Arc<dyn SubscriptionStore>,
    bus: Arc<dyn MessageBus>,
    normalizer: AddressNormalizer,
    topic_prefix: String,
}

impl NotificationDispatcher {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        bus: Arc<dyn MessageBus>,
        normalizer: AddressNormalizer,
        topic_prefix: impl Into<String>,
    ) -> Self {
        Self {
            subscriptions,
            bus,
            normalizer,
            topic_prefix: topic_prefix.into(),
        }
    }

    pub fn topic_for(&self, tag: &str) -> String {
        format!("{}{}", self.topic_prefix, tag)
    }

    /// Publish one notification per (subscriber, matched tag). Publish failures are
    /// collected in the report; only a failed subscription scan aborts.
    #[tracing::instrument(skip(self, event), fields(file_id = %event.record_id, kind = %event.kind))]
    pub async fn dispatch(&self, event: &ChangeEvent) -> Result<DispatchReport, AppError> {
        let mut report = DispatchReport::default();

        // Events posted from outside may carry tags in any case.
        let detected: BTreeSet<String> = event
            .tags
            .keys()
            .map(|tag| normalize_tag(tag))
            .filter(|tag| !tag.is_empty())
            .collect();
        if detected.is_empty() {
            return Ok(report);
        }

        let media_url = self.normalizer.public_address(&event.original_address);
        let subscriptions = self.subscriptions.all().await?;

        for subscription in &subscriptions {
            let matched = subscription
                .tags
                .iter()
                .filter(|tag| detected.contains(*tag));

            for tag in matched {
                let topic = self.topic_for(tag);
                let notification =
                    Notification::new_detection(&subscription.email, tag, &media_url);

                match self.bus.publish(&topic, &notification).await {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, topic = %topic, "Failed to publish notification");
                        report
                            .failed
                            .push((subscription.email.clone(), tag.clone(), e));
                    }
                }
            }
        }

        tracing::info!(
            subscribers = subscriptions.len(),
            sent = report.sent,
            failed = report.failed.len(),
            "Notifications dispatched"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestContext;
    use birdtag_core::{ChangeKind, StorageUri, Subscription, TagMap};

    fn event(tags: &[(&str, u32)]) -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Insert,
            record_id: "crow.jpg".to_string(),
            tags: tags.iter().map(|(k, v)| (k.to_string(), *v)).collect::<TagMap>(),
            original_address: StorageUri::new("media", "crow.jpg"),
        }
    }

    #[tokio::test]
    async fn test_one_message_per_matched_tag() {
        let ctx = TestContext::new();
        ctx.subscribe_direct(Subscription::new("crow@example.com", ["crow"])).await;
        ctx.subscribe_direct(Subscription::new("eagle@example.com", ["eagle"])).await;

        let report = ctx
            .dispatcher()
            .dispatch(&event(&[("crow", 2), ("pigeon", 1)]))
            .await
            .unwrap();

        assert_eq!(report.sent, 1);
        let published = ctx.bus.published();
        assert_eq!(published.len(), 1);
        let (topic, notification) = &published[0];
        assert_eq!(topic, "notify-crow");
        assert_eq!(notification.recipient, "crow@example.com");
        assert_eq!(notification.subject, "New media with a crow detected!");
        assert!(notification
            .body
            .ends_with("https://media.s3.us-east-1.amazonaws.com/crow.jpg"));
    }

    #[tokio::test]
    async fn test_multiple_matches_for_one_subscriber() {
        let ctx = TestContext::new();
        ctx.subscribe_direct(Subscription::new("a@example.com", ["crow", "pigeon", "eagle"]))
            .await;

        let report = ctx
            .dispatcher()
            .dispatch(&event(&[("crow", 2), ("pigeon", 1)]))
            .await
            .unwrap();

        assert_eq!(report.sent, 2);
    }

    #[tokio::test]
    async fn test_publish_failures_do_not_block_others() {
        let ctx = TestContext::new();
        ctx.subscribe_direct(Subscription::new("a@example.com", ["crow", "pigeon"])).await;
        ctx.bus.fail_topic("notify-crow");

        let report = ctx
            .dispatcher()
            .dispatch(&event(&[("crow", 2), ("pigeon", 1)]))
            .await
            .unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].1, "crow");
    }

    #[tokio::test]
    async fn test_no_tags_sends_nothing() {
        let ctx = TestContext::new();
        ctx.subscribe_direct(Subscription::new("a@example.com", ["crow"])).await;

        let report = ctx.dispatcher().dispatch(&event(&[])).await.unwrap();
        assert_eq!(report.sent, 0);
        assert!(ctx.bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_event_tags_are_normalised_before_matching() {
        let ctx = TestContext::new();
        ctx.subscribe_direct(Subscription::new("a@example.com", ["crow"])).await;

        let report = ctx
            .dispatcher()
            .dispatch(&event(&[(" Crow ", 1)]))
            .await
            .unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(ctx.bus.published()[0].0, "notify-crow");
    }
}
