//! Request/response cache adapter for a managed REST cache (Upstash protocol)
//!
//! Single commands are POSTed as a JSON array to the base URL; atomic batches
//! go to `/multi-exec`. Replies are `{"result": ..}` or `{"error": ".."}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::errors::{CacheError, CacheResult};
use super::traits::{CacheBackend, PipelineCommand};

#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct RestReply<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

impl<T> RestReply<T> {
    fn into_result(self, command: &str) -> CacheResult<Option<T>> {
        match self.error {
            Some(error) => Err(CacheError::BackendError(format!(
                "REST {command} failed: {error}"
            ))),
            None => Ok(self.result),
        }
    }
}

#[derive(Clone)]
pub struct RestCache {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for RestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestCache")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .finish()
    }
}

impl RestCache {
    pub fn new(url: &str, token: &str, timeout: Duration) -> CacheResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("forms-public-server/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                CacheError::ConnectionError(format!("Failed to build REST cache client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> CacheResult<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CacheError::Timeout(format!("REST cache request timed out: {}", e))
                } else {
                    CacheError::ConnectionError(format!("REST cache request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CacheError::BackendError(format!(
                "REST cache returned {status}: {text}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CacheError::SerializationError(format!("Invalid REST reply: {}", e)))
    }

    async fn command<T: DeserializeOwned>(&self, args: &[String]) -> CacheResult<Option<T>> {
        let reply: RestReply<T> = self.post("", args).await?;
        reply.into_result(args.first().map(String::as_str).unwrap_or("command"))
    }
}

#[async_trait]
impl CacheBackend for RestCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.command::<String>(&["GET".to_string(), key.to_string()])
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut args = vec!["SET".to_string(), key.to_string(), value.to_string()];
        if let Some(ttl) = ttl {
            args.push("EX".to_string());
            args.push(ttl.as_secs().max(1).to_string());
        }

        self.command::<String>(&args).await?;
        debug!(key = key, "Cache SET");
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.command::<i64>(&["DEL".to_string(), key.to_string()])
            .await?;
        debug!(key = key, "Cache DEL");
        Ok(())
    }

    async fn ttl(&self, key: &str) -> CacheResult<i64> {
        self.command::<i64>(&["TTL".to_string(), key.to_string()])
            .await?
            .ok_or_else(|| CacheError::BackendError("REST TTL returned no result".to_string()))
    }

    async fn exec_pipeline(&self, commands: &[PipelineCommand]) -> CacheResult<Vec<i64>> {
        let batch: Vec<Vec<String>> = commands.iter().map(PipelineCommand::to_args).collect();
        let replies: Vec<RestReply<i64>> = self.post("/multi-exec", &batch).await?;

        if replies.len() != commands.len() {
            return Err(CacheError::BackendError(format!(
                "REST multi-exec returned {} replies for {} commands",
                replies.len(),
                commands.len()
            )));
        }

        replies
            .into_iter()
            .map(|reply| {
                reply.into_result("multi-exec")?.ok_or_else(|| {
                    CacheError::BackendError("REST multi-exec returned a null reply".to_string())
                })
            })
            .collect()
    }

    async fn ping(&self) -> CacheResult<bool> {
        let pong = self.command::<String>(&["PING".to_string()]).await?;
        Ok(pong.as_deref() == Some("PONG"))
    }

    fn provider_name(&self) -> &'static str {
        "rest"
    }
}
