use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::idempotency_key::{self, Entity as IdempotencyKeyEntity},
    errors::ServiceError,
};

/// How many times a losing concurrent caller re-reads the key row before
/// giving up with `DuplicateRequest`. The in-flight winner usually commits
/// within this window.
const REPLAY_POLL_ATTEMPTS: usize = 5;
const REPLAY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Store-backed at-most-once execution keyed by a caller-supplied token.
/// Lives in the shared database so correctness holds across concurrent
/// service instances.
#[derive(Clone)]
pub struct IdempotencyService {
    db: Arc<DatabaseConnection>,
    ttl: chrono::Duration,
}

impl IdempotencyService {
    pub fn new(db: Arc<DatabaseConnection>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        Self { db, ttl }
    }

    /// Runs `op` at most once per live `key`. A replayed key returns the
    /// stored response without re-invoking `op`; a key raced by a concurrent
    /// caller resolves to exactly one winner via the primary-key uniqueness
    /// constraint, and the loser polls for the winner's snapshot.
    #[instrument(skip(self, op), fields(key = %key))]
    pub async fn execute_idempotent<T, F, Fut>(&self, key: &str, op: F) -> Result<T, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let key = key.trim();
        if key.is_empty() {
            return Err(ServiceError::ValidationError(
                "idempotency key must not be empty".to_string(),
            ));
        }

        let db = &*self.db;
        let now = Utc::now();

        if let Some(existing) = IdempotencyKeyEntity::find_by_id(key).one(db).await? {
            if now < existing.expires_at {
                if let Some(snapshot) = existing.response_snapshot {
                    info!("Replaying stored response for idempotency key");
                    return Ok(serde_json::from_value(snapshot)?);
                }
                // The original submission is still in flight.
                return self.await_winner(key).await;
            }

            // Expired keys are eligible for reuse as a brand-new request.
            // The delete matches the row only while it is still expired: if
            // a concurrent caller already replaced it with a live
            // placeholder, nothing is removed and the insert below resolves
            // the race through the uniqueness constraint instead.
            self.remove_expired_row(key, now).await?;
        }

        let placeholder = idempotency_key::ActiveModel {
            key: Set(key.to_string()),
            order_id: Set(None),
            response_snapshot: Set(None),
            created_at: Set(now),
            expires_at: Set(now + self.ttl),
        };

        if let Err(err) = placeholder.insert(db).await {
            if is_unique_violation(&err) {
                // A concurrent caller raced ahead of us.
                return self.await_winner(key).await;
            }
            return Err(err.into());
        }

        match op().await {
            Ok(value) => {
                let snapshot = serde_json::to_value(&value)?;
                let order_id = snapshot
                    .get("order_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Uuid::parse_str(s).ok());

                idempotency_key::ActiveModel {
                    key: Set(key.to_string()),
                    order_id: Set(order_id),
                    response_snapshot: Set(Some(snapshot)),
                    ..Default::default()
                }
                .update(db)
                .await?;

                Ok(value)
            }
            Err(err) => {
                // A failed operation committed nothing; release the key so a
                // retry can execute fresh.
                if let Err(delete_err) = IdempotencyKeyEntity::delete_by_id(key).exec(db).await {
                    warn!(error = %delete_err, "Failed to release idempotency key after error");
                }
                Err(err)
            }
        }
    }

    /// Deletes the row for `key` only while it is still expired as of `now`.
    /// Returns the number of rows removed; zero means a concurrent caller
    /// already replaced the row with a live one, which must survive.
    async fn remove_expired_row(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let result = IdempotencyKeyEntity::delete_many()
            .filter(idempotency_key::Column::Key.eq(key))
            .filter(idempotency_key::Column::ExpiresAt.lte(now))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// The losing side of an insert race: re-read the row a few times in
    /// case the winner commits quickly, then surface the transient error.
    async fn await_winner<T: DeserializeOwned>(&self, key: &str) -> Result<T, ServiceError> {
        for _ in 0..REPLAY_POLL_ATTEMPTS {
            tokio::time::sleep(REPLAY_POLL_INTERVAL).await;

            if let Some(row) = IdempotencyKeyEntity::find_by_id(key).one(&*self.db).await? {
                if let Some(snapshot) = row.response_snapshot {
                    info!("Concurrent winner committed; replaying its response");
                    return Ok(serde_json::from_value(snapshot)?);
                }
            }
        }

        Err(ServiceError::DuplicateRequest(key.to_string()))
    }

    /// Deletes keys past their expiry. Returns the number of rows removed.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        let result = IdempotencyKeyEntity::delete_many()
            .filter(idempotency_key::Column::ExpiresAt.lt(Utc::now()))
            .exec(&*self.db)
            .await?;

        if result.rows_affected > 0 {
            info!(purged = result.rows_affected, "Purged expired idempotency keys");
        }
        Ok(result.rows_affected)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
