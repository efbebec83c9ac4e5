//! Collaborator and service initialization

use super::BackgroundTasks;
use crate::constants::TRANSIENT_CLEANUP_INTERVAL_SECS;
use crate::state::{AppState, Collaborators};
use anyhow::{Context, Result};
use birdtag_core::{Config, MessagingBackend};
use birdtag_db::create_repositories;
use birdtag_services::{
    change_feed, LogMessageBus, MessageBus, NotificationWorker, SpeciesDetector,
    TransientResultCleanup, UnconfiguredDetector,
};
use birdtag_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Build collaborators from config, wire the services and start background tasks
pub async fn initialize_services(
    config: &Config,
    pool: Option<PgPool>,
    storage: Arc<dyn Storage>,
) -> Result<(Arc<AppState>, BackgroundTasks)> {
    let repositories = create_repositories(config, pool.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize repositories: {}", e))?;

    let bus = setup_message_bus(config).await?;
    let detector = setup_detector(config)?;

    let (feed, feed_rx) = change_feed(config.change_feed_capacity());

    let state = Arc::new(AppState::build(
        config.clone(),
        Collaborators {
            pool,
            repositories: repositories.clone(),
            storage,
            bus,
            detector,
        },
        feed,
    ));

    let notification_worker = NotificationWorker::new(state.dispatcher.clone()).start(feed_rx);

    let cleanup = Arc::new(TransientResultCleanup::new(
        repositories.transient_results.clone(),
        Duration::from_secs(TRANSIENT_CLEANUP_INTERVAL_SECS),
    ));
    let transient_cleanup = cleanup.start();

    tracing::info!(
        change_feed_capacity = config.change_feed_capacity(),
        cleanup_interval_secs = TRANSIENT_CLEANUP_INTERVAL_SECS,
        "Services initialized"
    );

    Ok((
        state,
        BackgroundTasks {
            notification_worker,
            transient_cleanup,
        },
    ))
}

async fn setup_message_bus(config: &Config) -> Result<Arc<dyn MessageBus>> {
    match config.messaging_backend() {
        #[cfg(feature = "messaging-sns")]
        MessagingBackend::Sns => {
            let region = config
                .aws_region()
                .or_else(|| config.s3_region())
                .context("AWS_REGION must be set for the SNS messaging backend")?;
            let account_id = config
                .aws_account_id()
                .context("AWS_ACCOUNT_ID must be set for the SNS messaging backend")?;

            tracing::info!(region = %region, "Using SNS messaging backend");
            Ok(Arc::new(
                birdtag_services::SnsMessageBus::new(region, account_id).await,
            ))
        }
        #[cfg(not(feature = "messaging-sns"))]
        MessagingBackend::Sns => Err(anyhow::anyhow!(
            "SNS messaging backend not available (messaging-sns feature not enabled)"
        )),
        MessagingBackend::Log => {
            tracing::warn!("Using log-only messaging backend; no notifications are delivered");
            Ok(Arc::new(LogMessageBus::new()))
        }
    }
}

fn setup_detector(config: &Config) -> Result<Arc<dyn SpeciesDetector>> {
    let Some(url) = config.detector_url() else {
        tracing::warn!("DETECTOR_URL not set; ingestion and upload matching will fail");
        return Ok(Arc::new(UnconfiguredDetector));
    };

    #[cfg(feature = "detector-http")]
    {
        let detector = birdtag_services::HttpSpeciesDetector::new(
            url,
            Duration::from_secs(config.detector_timeout_secs()),
        )?;
        tracing::info!(url = %url, "Using HTTP species detector");
        Ok(Arc::new(detector))
    }

    #[cfg(not(feature = "detector-http"))]
    {
        tracing::warn!(url = %url, "HTTP detector support not compiled in (detector-http feature not enabled)");
        Ok(Arc::new(UnconfiguredDetector))
    }
}
