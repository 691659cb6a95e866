//! Redis store backend.
//!
//! Operations are buffered client-side in a [`Batch`] and sent on commit as
//! one `MULTI ... EXEC` pipeline. Aborting never touches the server.

use std::future::Future;

use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, StoreError};

use super::{Batch, IndexOp, OrderedStore, ScoredMember};

/// Ordered store backed by Redis sorted sets.
///
/// The `ConnectionManager` is cloned per call, so concurrent commits from
/// different tasks never share a pipeline.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Connect to the Redis server named by [`Config::redis_url`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no URL is configured, or
    /// [`Error::Store`] if the connection fails.
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let url = config
            .redis_url()
            .ok_or_else(|| Error::Config("redis URL is not configured".into()))?;
        Ok(Self::connect(url).await?)
    }

    fn pipeline(batch: Batch) -> ::redis::Pipeline {
        let mut pipe = ::redis::pipe();
        pipe.atomic();
        for op in batch.into_ops() {
            match op {
                IndexOp::Add { key, member, score } => {
                    pipe.zadd(key, member, score).ignore();
                }
                IndexOp::Remove { key, member } => {
                    pipe.zrem(key, member).ignore();
                }
            }
        }
        pipe
    }
}

impl OrderedStore for RedisStore {
    type Tx = Batch;

    fn begin(&self) -> Result<Batch, StoreError> {
        Ok(Batch::new())
    }

    fn commit(&self, tx: Batch) -> impl Future<Output = Result<(), StoreError>> + Send {
        let mut conn = self.conn.clone();
        let ops = tx.ops().len();
        let pipe = Self::pipeline(tx);
        async move {
            if ops == 0 {
                return Ok(());
            }
            let _: () = pipe.query_async(&mut conn).await?;
            debug!(ops, "EXEC applied");
            Ok(())
        }
    }

    fn abort(&self, tx: Batch) {
        debug!(ops = tx.ops().len(), "Discarding queued commands");
    }

    fn range(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Vec<ScoredMember>, StoreError>> + Send {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        async move {
            let raw: Vec<(String, f64)> = conn.zrange_withscores(&key, 0, -1).await?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let members = raw
                .into_iter()
                .map(|(member, score)| ScoredMember {
                    member,
                    score: score as u64,
                })
                .collect();
            Ok(members)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_requires_url() {
        let err = RedisStore::from_config(&Config::new()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
