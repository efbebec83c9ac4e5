use async_trait::async_trait;
use birdtag_core::AppError;
#[cfg(feature = "messaging-sns")]
use aws_config::BehaviorVersion;
#[cfg(feature = "messaging-sns")]
use aws_sdk_sns::Client as SnsClient;

/// A message for one subscriber about one detected tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub tag: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new_detection(recipient: &str, tag: &str, media_url: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            tag: tag.to_string(),
            subject: format!("New media with a {} detected!", tag),
            body: format!("A new {} was detected! View: {}", tag, media_url),
        }
    }
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Subscribe an email endpoint to a topic, creating the topic if needed
    async fn subscribe(&self, topic: &str, email: &str) -> Result<(), AppError>;

    /// Publish a notification to a topic
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), AppError>;
}

/// Message bus that only logs; used for local development
#[derive(Debug, Clone, Default)]
pub struct LogMessageBus;

impl LogMessageBus {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageBus for LogMessageBus {
    async fn subscribe(&self, topic: &str, email: &str) -> Result<(), AppError> {
        tracing::info!(topic = %topic, email = %email, "Subscribed (log bus)");
        Ok(())
    }

    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), AppError> {
        tracing::info!(
            topic = %topic,
            recipient = %notification.recipient,
            subject = %notification.subject,
            body = %notification.body,
            "Notification published (log bus)"
        );
        Ok(())
    }
}

/// AWS SNS message bus. Topics are addressed by name under one account and region.
#[cfg(feature = "messaging-sns")]
#[derive(Clone)]
pub struct SnsMessageBus {
    client: SnsClient,
    region: String,
    account_id: String,
}

#[cfg(feature = "messaging-sns")]
impl SnsMessageBus {
    pub async fn new(region: &str, account_id: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: SnsClient::new(&config),
            region: region.to_string(),
            account_id: account_id.to_string(),
        }
    }

    fn topic_arn(&self, topic: &str) -> String {
        format!("arn:aws:sns:{}:{}:{}", self.region, self.account_id, topic)
    }
}

#[cfg(feature = "messaging-sns")]
#[async_trait]
impl MessageBus for SnsMessageBus {
    #[tracing::instrument(skip(self, email), fields(messaging.system = "sns", topic = %topic))]
    async fn subscribe(&self, topic: &str, email: &str) -> Result<(), AppError> {
        // CreateTopic is idempotent and returns the ARN of an existing topic
        let created = self
            .client
            .create_topic()
            .name(topic)
            .send()
            .await
            .map_err(|e| AppError::PublishFailure(format!("Failed to create topic {}: {}", topic, e)))?;

        let topic_arn = created
            .topic_arn()
            .map(str::to_string)
            .unwrap_or_else(|| self.topic_arn(topic));

        self.client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol("email")
            .endpoint(email)
            .send()
            .await
            .map_err(|e| AppError::PublishFailure(format!("Failed to subscribe to {}: {}", topic, e)))?;

        tracing::info!(topic = %topic, "SNS subscription requested");
        Ok(())
    }

    #[tracing::instrument(skip(self, notification), fields(messaging.system = "sns", topic = %topic))]
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), AppError> {
        let start = std::time::Instant::now();

        let output = self
            .client
            .publish()
            .topic_arn(self.topic_arn(topic))
            .subject(&notification.subject)
            .message(&notification.body)
            .send()
            .await
            .map_err(|e| AppError::PublishFailure(format!("Failed to publish to {}: {}", topic, e)))?;

        tracing::debug!(
            topic = %topic,
            message_id = ?output.message_id(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "SNS publish successful"
        );
        Ok(())
    }
}
