use async_trait::async_trait;
use birdtag_core::AppError;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::notification::{MessageBus, Notification};

/// Message bus that records every call; topics can be made to fail
#[derive(Default)]
pub struct RecordingMessageBus {
    subscriptions: Mutex<Vec<(String, String)>>,
    published: Mutex<Vec<(String, Notification)>>,
    failing_topics: Mutex<HashSet<String>>,
}

impl RecordingMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subscribe and publish on `topic` fail
    pub fn fail_topic(&self, topic: &str) {
        self.failing_topics.lock().unwrap().insert(topic.to_string());
    }

    /// Successful (topic, email) subscriptions in call order
    pub fn subscriptions(&self) -> Vec<(String, String)> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Successful (topic, notification) publishes in call order
    pub fn published(&self) -> Vec<(String, Notification)> {
        self.published.lock().unwrap().clone()
    }

    fn check(&self, topic: &str) -> Result<(), AppError> {
        if self.failing_topics.lock().unwrap().contains(topic) {
            return Err(AppError::PublishFailure(format!(
                "Injected failure for topic {}",
                topic
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageBus for RecordingMessageBus {
    async fn subscribe(&self, topic: &str, email: &str) -> Result<(), AppError> {
        self.check(topic)?;
        self.subscriptions
            .lock()
            .unwrap()
            .push((topic.to_string(), email.to_string()));
        Ok(())
    }

    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), AppError> {
        self.check(topic)?;
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), notification.clone()));
        Ok(())
    }
}
