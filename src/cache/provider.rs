//! Advisory cache facade
//!
//! Every call is bounded by a timeout. Reads degrade to a miss and writes to
//! a no-op on any failure, so the cache is never a source of request failure.
//! Only `pipeline` reports errors, because the rate limiter has to invert
//! that policy.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::{CacheError, CacheResult};
use super::redis::RedisCache;
use super::rest::RestCache;
use super::traits::{CacheBackend, PipelineCommand};
use crate::config::CacheSettings;

#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.provider_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Build the one adapter selected by configuration
    pub async fn connect(settings: &CacheSettings, timeout: Duration) -> CacheResult<Self> {
        let backend: Arc<dyn CacheBackend> = match settings {
            CacheSettings::Rest { url, token } => Arc::new(RestCache::new(url, token, timeout)?),
            CacheSettings::Redis {
                url,
                max_retries,
                connect_timeout,
            } => Arc::new(RedisCache::connect(url, *max_retries, *connect_timeout).await?),
        };

        info!(
            backend = backend.provider_name(),
            timeout_ms = timeout.as_millis() as u64,
            "Cache provider initialized"
        );

        Ok(Self::new(backend, timeout))
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(format!("{operation} exceeded {:?}", self.timeout)))?
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        match self.bounded("GET", self.backend.get(key)).await {
            Ok(Some(value)) => {
                debug!(key = key, "Cache HIT");
                Some(value)
            }
            Ok(None) => {
                debug!(key = key, "Cache MISS");
                None
            }
            Err(e) => {
                warn!(key = key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        if let Err(e) = self.bounded("SET", self.backend.set(key, value, ttl)).await {
            warn!(key = key, error = %e, "Cache write failed, skipping");
        }
    }

    pub async fn del(&self, key: &str) {
        if let Err(e) = self.bounded("DEL", self.backend.del(key)).await {
            warn!(key = key, error = %e, "Cache delete failed, skipping");
        }
    }

    /// Remaining lifetime in seconds, `-1` when unknown
    pub async fn ttl(&self, key: &str) -> i64 {
        match self.bounded("TTL", self.backend.ttl(key)).await {
            Ok(ttl) if ttl >= 0 => ttl,
            Ok(_) => -1,
            Err(e) => {
                warn!(key = key, error = %e, "Cache TTL failed");
                -1
            }
        }
    }

    /// Read and decode a JSON value. A payload that no longer decodes is
    /// deleted so it is not re-parsed on every request.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = key, error = %e, "Corrupted cache entry, removing");
                self.del(key).await;
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => warn!(key = key, error = %e, "Cache serialization failed, skipping"),
        }
    }

    /// Atomic batch. Errors are returned, not absorbed.
    pub async fn pipeline(&self, commands: &[PipelineCommand]) -> CacheResult<Vec<i64>> {
        self.bounded("MULTI/EXEC", self.backend.exec_pipeline(commands))
            .await
    }

    pub async fn is_healthy(&self) -> bool {
        matches!(self.bounded("PING", self.backend.ping()).await, Ok(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Map-backed backend that can be switched into a failing or slow mode
    #[derive(Default)]
    struct ScriptedBackend {
        entries: Mutex<HashMap<String, String>>,
        deletes: Mutex<Vec<String>>,
        failing: bool,
        delay: Option<Duration>,
        ttl_reply: Option<i64>,
    }

    impl ScriptedBackend {
        fn check(&self) -> CacheResult<()> {
            if self.failing {
                Err(CacheError::ConnectionError("connection refused".into()))
            } else {
                Ok(())
            }
        }

        async fn maybe_sleep(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl CacheBackend for ScriptedBackend {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.maybe_sleep().await;
            self.check()?;
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> CacheResult<()> {
            self.check()?;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn del(&self, key: &str) -> CacheResult<()> {
            self.check()?;
            self.entries.lock().unwrap().remove(key);
            self.deletes.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn ttl(&self, _key: &str) -> CacheResult<i64> {
            self.check()?;
            Ok(self.ttl_reply.unwrap_or(42))
        }

        async fn exec_pipeline(&self, commands: &[PipelineCommand]) -> CacheResult<Vec<i64>> {
            self.check()?;
            Ok(vec![1; commands.len()])
        }

        async fn ping(&self) -> CacheResult<bool> {
            self.check()?;
            Ok(true)
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn cache_over(backend: ScriptedBackend) -> (Cache, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        (Cache::new(backend.clone(), Duration::from_millis(50)), backend)
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let (cache, _) = cache_over(ScriptedBackend::default());
        cache
            .set_json("k", &vec!["a".to_string()], Some(Duration::from_secs(60)))
            .await;

        let value: Option<Vec<String>> = cache.get_json("k").await;
        assert_eq!(value, Some(vec!["a".to_string()]));
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_deleted() {
        let (cache, backend) = cache_over(ScriptedBackend::default());
        cache.set("k", "{not json", None).await;

        let value: Option<Vec<String>> = cache.get_json("k").await;

        assert!(value.is_none());
        assert_eq!(*backend.deletes.lock().unwrap(), vec!["k".to_string()]);
        assert!(backend.entries.lock().unwrap().get("k").is_none());
    }

    #[tokio::test]
    async fn test_failures_degrade_to_miss() {
        let (cache, _) = cache_over(ScriptedBackend {
            failing: true,
            ..Default::default()
        });

        assert!(cache.get("k").await.is_none());
        cache.set("k", "v", None).await;
        cache.del("k").await;
        assert_eq!(cache.ttl("k").await, -1);
        assert!(!cache.is_healthy().await);
    }

    #[tokio::test]
    async fn test_ttl_for_missing_key_is_minus_one() {
        let (cache, _) = cache_over(ScriptedBackend {
            ttl_reply: Some(-2),
            ..Default::default()
        });
        assert_eq!(cache.ttl("gone").await, -1);

        let (cache, _) = cache_over(ScriptedBackend::default());
        assert_eq!(cache.ttl("k").await, 42);
    }

    #[tokio::test]
    async fn test_pipeline_reports_failure() {
        let (cache, _) = cache_over(ScriptedBackend {
            failing: true,
            ..Default::default()
        });

        let result = cache.pipeline(&[PipelineCommand::Incr("k".into())]).await;
        assert!(matches!(result, Err(CacheError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_as_miss() {
        let (cache, _) = cache_over(ScriptedBackend {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });

        assert!(cache.get("k").await.is_none());
    }
}
