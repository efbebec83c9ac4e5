//! In-process change feed
//!
//! Writers publish `ChangeEvent`s onto a bounded channel; a single
//! `NotificationWorker` drains it and runs the dispatcher for each event.
//! A full channel applies backpressure to the writer until the worker catches
//! up; an event is only lost once the worker has stopped.

use std::sync::Arc;

use birdtag_core::ChangeEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::notification::NotificationDispatcher;

/// Sending half of the change feed
#[derive(Clone)]
pub struct ChangeFeed {
    tx: mpsc::Sender<ChangeEvent>,
}

/// Create a bounded change feed and its receiving half.
pub fn change_feed(capacity: usize) -> (ChangeFeed, mpsc::Receiver<ChangeEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChangeFeed { tx }, rx)
}

impl ChangeFeed {
    /// A feed whose receiver is already gone; every publish is dropped.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }

    /// Enqueue an event, waiting for capacity when the feed is full.
    /// Returns false only when the worker is gone.
    pub async fn publish(&self, event: ChangeEvent) -> bool {
        let record_id = event.record_id.clone();
        if self.tx.capacity() == 0 {
            tracing::debug!(file_id = %record_id, "Change feed is full, waiting for the worker");
        }
        match self.tx.send(event).await {
            Ok(()) => {
                tracing::debug!(file_id = %record_id, "Change event queued");
                true
            }
            Err(_) => {
                tracing::warn!(file_id = %record_id, "Change feed is closed, dropping event");
                false
            }
        }
    }
}

/// Background task that dispatches notifications for every change event
pub struct NotificationWorker {
    dispatcher: Arc<NotificationDispatcher>,
}

impl NotificationWorker {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Start draining `rx`. The task ends when every `ChangeFeed` is dropped.
    pub fn start(self, mut rx: mpsc::Receiver<ChangeEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Notification worker started");

            while let Some(event) = rx.recv().await {
                match self.dispatcher.dispatch(&event).await {
                    Ok(report) => {
                        if !report.failed.is_empty() {
                            tracing::warn!(
                                file_id = %event.record_id,
                                sent = report.sent,
                                failed = report.failed.len(),
                                "Some notifications failed to publish"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            file_id = %event.record_id,
                            "Notification dispatch failed"
                        );
                    }
                }
            }

            tracing::info!("Notification worker stopped");
        })
    }
}
