//! Fixed-window rate limiting on top of the cache's atomic batch
//!
//! One counter per `(bucket, caller)` pair lives at `throttle:{bucket}:{caller}`.
//! Every hit runs `INCR`, `EXPIRE .. NX` and `TTL` as one MULTI/EXEC, so two
//! concurrent requests can never both read a pre-increment count.
//!
//! Unlike every other cache consumer, this one fails secure: if the batch
//! errors, the caller is reported as blocked.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use crate::cache::{Cache, PipelineCommand};
use crate::config::ThrottleBucket;
use crate::constants::{throttle_key, UNKNOWN_CLIENT_PART};
use crate::error::{AppError, Result};
use crate::models::ClientMeta;

/// Outcome of one counted hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleRecord {
    pub total_hits: u64,
    pub time_to_expire_ms: u64,
    pub is_blocked: bool,
}

#[derive(Debug, Clone)]
pub struct ThrottleStorage {
    cache: Cache,
}

impl ThrottleStorage {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Count one hit for `caller_key` in the named bucket
    pub async fn increment(
        &self,
        bucket_name: &str,
        caller_key: &str,
        window_ms: u64,
        limit: u64,
    ) -> ThrottleRecord {
        let key = throttle_key(bucket_name, caller_key);
        let commands = [
            PipelineCommand::Incr(key.clone()),
            PipelineCommand::ExpireIfUnset {
                key: key.clone(),
                seconds: window_ms.div_ceil(1000).max(1),
            },
            PipelineCommand::Ttl(key.clone()),
        ];

        let replies = match self.cache.pipeline(&commands).await {
            Ok(replies) => replies,
            Err(e) => {
                error!(key = %key, error = %e, "Throttle storage unavailable, blocking request");
                return Self::blocked(window_ms, limit);
            }
        };

        let (hits, ttl) = match replies.as_slice() {
            [hits, _expire, ttl] if *hits > 0 => (*hits as u64, *ttl),
            other => {
                error!(key = %key, replies = ?other, "Unexpected throttle batch reply, blocking request");
                return Self::blocked(window_ms, limit);
            }
        };

        let time_to_expire_ms = if ttl > 0 {
            ttl as u64 * 1000
        } else {
            window_ms
        };

        let record = ThrottleRecord {
            total_hits: hits,
            time_to_expire_ms,
            is_blocked: hits > limit,
        };

        debug!(
            key = %key,
            hits = record.total_hits,
            limit = limit,
            blocked = record.is_blocked,
            "Throttle hit counted"
        );

        record
    }

    fn blocked(window_ms: u64, limit: u64) -> ThrottleRecord {
        ThrottleRecord {
            total_hits: limit.saturating_add(1),
            time_to_expire_ms: window_ms,
            is_blocked: true,
        }
    }
}

/// State for one `enforce_bucket` layer
#[derive(Debug, Clone)]
pub struct BucketGuard {
    pub storage: ThrottleStorage,
    pub bucket: ThrottleBucket,
}

impl BucketGuard {
    pub fn new(storage: ThrottleStorage, bucket: ThrottleBucket) -> Self {
        Self { storage, bucket }
    }
}

/// Admission check for one bucket; requires `ClientMeta` in the extensions
pub async fn enforce_bucket(
    State(guard): State<BucketGuard>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let caller_key = request
        .extensions()
        .get::<ClientMeta>()
        .and_then(|client| client.ip.clone())
        .unwrap_or_else(|| UNKNOWN_CLIENT_PART.to_string());

    let bucket = guard.bucket;
    let record = guard
        .storage
        .increment(bucket.name, &caller_key, bucket.window_ms, bucket.limit)
        .await;

    if record.is_blocked {
        warn!(
            bucket = bucket.name,
            caller = %caller_key,
            hits = record.total_hits,
            "Rate limit exceeded"
        );
        return Err(AppError::RateLimited {
            retry_after_ms: record.time_to_expire_ms,
        });
    }

    Ok(next.run(request).await)
}
