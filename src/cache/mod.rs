//! # Key-Value Cache
//!
//! ```text
//! Cache (facade: timeouts, miss-on-failure, JSON helpers)
//!   └── Arc<dyn CacheBackend>
//!         ├── RestCache   <- managed cache over HTTPS (Upstash protocol)
//!         └── RedisCache  <- persistent ConnectionManager connection
//! ```
//!
//! Exactly one backend is built at start-up from `CacheSettings`; call sites
//! only ever see `Cache`. The cache holds no authority over canonical state.

pub mod errors;
pub mod provider;
pub mod redis;
pub mod rest;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use provider::Cache;
pub use traits::{CacheBackend, PipelineCommand};
