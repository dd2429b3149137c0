//! View deduplication and submission store
//!
//! Owns every write on the public path. Counter increments only ever happen
//! inside the same transaction as the row they count.

pub mod pool;
pub mod postgres;

pub use pool::create_pool;
pub use postgres::{CounterDrift, PgFormStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Form, FormSnapshot, NewActivity, NewSubmission};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait FormStore: Send + Sync {
    /// Full form with ordered fields and password hash
    async fn find_form(&self, form_id: &str) -> StoreResult<Option<Form>>;

    /// Gate-only columns, read on every cache hit
    async fn find_snapshot(&self, form_id: &str) -> StoreResult<Option<FormSnapshot>>;

    /// `None` when the form does not exist, `Some(None)` when it has no password
    async fn find_password_hash(&self, form_id: &str) -> StoreResult<Option<Option<String>>>;

    /// Insert the `(form, fingerprint)` view and bump `total_views` in one
    /// transaction. Returns `false` when the pair was already recorded.
    async fn record_view(&self, form_id: &str, fingerprint: &str) -> StoreResult<bool>;

    async fn has_submission_from(&self, form_id: &str, fingerprint: &str) -> StoreResult<bool>;

    /// Insert the submission with its values, bump `total_responses` and set
    /// `last_response_at`, all in one transaction. Returns the submission id.
    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<String>;

    async fn record_activity(&self, activity: NewActivity) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;
}
