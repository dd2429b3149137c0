use async_trait::async_trait;
use std::time::Duration;

use super::errors::CacheResult;

/// One command inside an atomic batch. Every variant replies with an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCommand {
    Incr(String),
    /// `EXPIRE key seconds NX`: only applies when the key has no expiry yet
    ExpireIfUnset { key: String, seconds: u64 },
    Ttl(String),
}

impl PipelineCommand {
    /// Wire form shared by both adapters, e.g. `["INCR", "throttle:default:1.2.3.4"]`
    pub fn to_args(&self) -> Vec<String> {
        match self {
            PipelineCommand::Incr(key) => vec!["INCR".into(), key.clone()],
            PipelineCommand::ExpireIfUnset { key, seconds } => vec![
                "EXPIRE".into(),
                key.clone(),
                seconds.to_string(),
                "NX".into(),
            ],
            PipelineCommand::Ttl(key) => vec!["TTL".into(), key.clone()],
        }
    }
}

/// Operations every remote cache adapter provides.
///
/// Adapters report failures faithfully; deciding whether a failure is a
/// miss or a blocked request is up to the caller (`Cache` or the limiter).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns `Ok(Some(value))` on hit, `Ok(None)` on miss.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    async fn del(&self, key: &str) -> CacheResult<()>;

    /// Remaining lifetime in seconds; negative when the key is missing or has no expiry.
    async fn ttl(&self, key: &str) -> CacheResult<i64>;

    /// Run all commands as a single atomic batch, one integer reply per command.
    async fn exec_pipeline(&self, commands: &[PipelineCommand]) -> CacheResult<Vec<i64>>;

    async fn ping(&self) -> CacheResult<bool>;

    fn provider_name(&self) -> &'static str;
}
