//! Subscription repository

use async_trait::async_trait;
use birdtag_core::{AppError, Subscription};
use sqlx::{FromRow, PgPool, Postgres};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Store the subscription, replacing any previous tag set for the email
    async fn put(&self, subscription: &Subscription) -> Result<(), AppError>;

    async fn get(&self, email: &str) -> Result<Option<Subscription>, AppError>;

    async fn all(&self) -> Result<Vec<Subscription>, AppError>;
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    email: String,
    tags: Vec<String>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription::new(row.email, row.tags)
    }
}

#[derive(Clone)]
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    #[tracing::instrument(skip(self, subscription), fields(db.table = "subscriptions", db.operation = "upsert", tag_count = subscription.tags.len()))]
    async fn put(&self, subscription: &Subscription) -> Result<(), AppError> {
        let tags: Vec<String> = subscription.tags.iter().cloned().collect();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (email, tags)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET
                tags = EXCLUDED.tags,
                updated_at = NOW()
            "#,
        )
        .bind(&subscription.email)
        .bind(&tags)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "select"))]
    async fn get(&self, email: &str) -> Result<Option<Subscription>, AppError> {
        let row = sqlx::query_as::<Postgres, SubscriptionRow>(
            "SELECT email, tags FROM subscriptions WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Subscription::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "scan"))]
    async fn all(&self) -> Result<Vec<Subscription>, AppError> {
        let rows = sqlx::query_as::<Postgres, SubscriptionRow>(
            "SELECT email, tags FROM subscriptions ORDER BY email",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }
}
