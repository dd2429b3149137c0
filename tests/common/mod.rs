//! Shared fixtures: in-memory doubles for the store and the cache backend
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forms_public_server::cache::{CacheBackend, CacheError, CacheResult, PipelineCommand};
use forms_public_server::config::{CacheSettings, ThrottlePolicy};
use forms_public_server::db::{FormStore, StoreError, StoreResult};
use forms_public_server::models::{
    Field, Form, FormSnapshot, FormStatus, NewActivity, NewSubmission,
};
use forms_public_server::{build_router, AppState, Cache, Config};

// =============================================================================
// Store Double
// =============================================================================

#[derive(Default)]
struct MemoryState {
    forms: HashMap<String, Form>,
    total_views: HashMap<String, i32>,
    views: HashSet<(String, String)>,
    submissions: Vec<(String, NewSubmission)>,
    activities: Vec<NewActivity>,
}

/// Every transaction is one critical section over the whole state
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn insert_form(&self, form: Form) {
        let mut state = self.state.lock().unwrap();
        state.total_views.insert(form.id.clone(), 0);
        state.forms.insert(form.id.clone(), form);
    }

    /// Apply an owner-side edit, bypassing the public path
    pub fn update_form(&self, form_id: &str, edit: impl FnOnce(&mut Form)) {
        let mut state = self.state.lock().unwrap();
        if let Some(form) = state.forms.get_mut(form_id) {
            edit(form);
        }
    }

    pub fn total_views(&self, form_id: &str) -> i32 {
        let state = self.state.lock().unwrap();
        state.total_views.get(form_id).copied().unwrap_or(0)
    }

    pub fn total_responses(&self, form_id: &str) -> i32 {
        let state = self.state.lock().unwrap();
        state
            .forms
            .get(form_id)
            .map(|form| form.total_responses)
            .unwrap_or(0)
    }

    pub fn submissions(&self, form_id: &str) -> Vec<NewSubmission> {
        let state = self.state.lock().unwrap();
        state
            .submissions
            .iter()
            .filter(|(_, submission)| submission.form_id == form_id)
            .map(|(_, submission)| submission.clone())
            .collect()
    }

    pub fn activities(&self) -> Vec<NewActivity> {
        self.state.lock().unwrap().activities.clone()
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn find_form(&self, form_id: &str) -> StoreResult<Option<Form>> {
        Ok(self.state.lock().unwrap().forms.get(form_id).cloned())
    }

    async fn find_snapshot(&self, form_id: &str) -> StoreResult<Option<FormSnapshot>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .forms
            .get(form_id)
            .map(Form::snapshot))
    }

    async fn find_password_hash(&self, form_id: &str) -> StoreResult<Option<Option<String>>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .forms
            .get(form_id)
            .map(|form| form.password_hash.clone()))
    }

    async fn record_view(&self, form_id: &str, fingerprint: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        let inserted = state
            .views
            .insert((form_id.to_string(), fingerprint.to_string()));
        if inserted {
            *state.total_views.entry(form_id.to_string()).or_insert(0) += 1;
        }
        Ok(inserted)
    }

    async fn has_submission_from(&self, form_id: &str, fingerprint: &str) -> StoreResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .submissions
            .iter()
            .any(|(_, s)| s.form_id == form_id && s.fingerprint == fingerprint))
    }

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<String> {
        let mut state = self.state.lock().unwrap();
        let id = format!("submission-{}", state.submissions.len() + 1);

        if let Some(form) = state.forms.get_mut(&submission.form_id) {
            form.total_responses += 1;
        }
        state.submissions.push((id.clone(), submission));

        Ok(id)
    }

    async fn record_activity(&self, activity: NewActivity) -> StoreResult<()> {
        self.state.lock().unwrap().activities.push(activity);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Reads and submissions succeed; view tracking and activity writes always fail
pub struct LossyStore {
    pub inner: MemoryStore,
}

fn write_rejected() -> StoreError {
    StoreError::InvalidData("write rejected".to_string())
}

#[async_trait]
impl FormStore for LossyStore {
    async fn find_form(&self, form_id: &str) -> StoreResult<Option<Form>> {
        self.inner.find_form(form_id).await
    }

    async fn find_snapshot(&self, form_id: &str) -> StoreResult<Option<FormSnapshot>> {
        self.inner.find_snapshot(form_id).await
    }

    async fn find_password_hash(&self, form_id: &str) -> StoreResult<Option<Option<String>>> {
        self.inner.find_password_hash(form_id).await
    }

    async fn record_view(&self, _form_id: &str, _fingerprint: &str) -> StoreResult<bool> {
        Err(write_rejected())
    }

    async fn has_submission_from(&self, form_id: &str, fingerprint: &str) -> StoreResult<bool> {
        self.inner.has_submission_from(form_id, fingerprint).await
    }

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<String> {
        self.inner.create_submission(submission).await
    }

    async fn record_activity(&self, _activity: NewActivity) -> StoreResult<()> {
        Err(write_rejected())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

// =============================================================================
// Cache Doubles
// =============================================================================

/// Map-backed cache; TTLs are accepted and ignored
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    counters: Mutex<HashMap<String, i64>>,
}

impl MemoryCache {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> CacheResult<()> {
        self.put_raw(key, value);
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn ttl(&self, _key: &str) -> CacheResult<i64> {
        Ok(-1)
    }

    async fn exec_pipeline(&self, commands: &[PipelineCommand]) -> CacheResult<Vec<i64>> {
        let mut counters = self.counters.lock().unwrap();
        Ok(commands
            .iter()
            .map(|command| match command {
                PipelineCommand::Incr(key) => {
                    let counter = counters.entry(key.clone()).or_insert(0);
                    *counter += 1;
                    *counter
                }
                PipelineCommand::ExpireIfUnset { .. } => 1,
                PipelineCommand::Ttl(_) => 60,
            })
            .collect())
    }

    async fn ping(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Simulates a cache that cannot be reached at all
pub struct UnreachableCache;

fn refused<T>() -> CacheResult<T> {
    Err(CacheError::ConnectionError("connection refused".to_string()))
}

#[async_trait]
impl CacheBackend for UnreachableCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        refused()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> CacheResult<()> {
        refused()
    }

    async fn del(&self, _key: &str) -> CacheResult<()> {
        refused()
    }

    async fn ttl(&self, _key: &str) -> CacheResult<i64> {
        refused()
    }

    async fn exec_pipeline(&self, _commands: &[PipelineCommand]) -> CacheResult<Vec<i64>> {
        refused()
    }

    async fn ping(&self) -> CacheResult<bool> {
        refused()
    }

    fn provider_name(&self) -> &'static str {
        "unreachable"
    }
}

// =============================================================================
// App Fixture
// =============================================================================

pub fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        allowed_origins: vec!["http://localhost:5173".to_string()],
        environment: "test".to_string(),
        trust_proxy: true,
        cache: CacheSettings::Redis {
            url: "redis://unused".to_string(),
            max_retries: 0,
            connect_timeout: Duration::from_millis(10),
        },
        cache_timeout: Duration::from_millis(200),
        public_form_cache_ttl: Duration::from_secs(600),
        throttle: ThrottlePolicy::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let cache = Arc::new(MemoryCache::default());
        let router = app_with(store.clone(), cache.clone());
        Self {
            router,
            store,
            cache,
        }
    }

    /// Send one request through a clone of the router
    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn app_with(store: Arc<dyn FormStore>, backend: Arc<dyn CacheBackend>) -> Router {
    let config = test_config();
    let cache = Cache::new(backend, config.cache_timeout);
    build_router(AppState::new(store, cache, config))
}

// =============================================================================
// Requests and Bodies
// =============================================================================

pub const DEFAULT_UA: &str = "Mozilla/5.0 (integration-tests)";

pub fn get_from(uri: &str, ip: &str, user_agent: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", ip)
        .header(header::USER_AGENT, user_agent)
        .body(Body::empty())
        .unwrap()
}

pub fn post_from(uri: &str, ip: &str, user_agent: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", ip)
        .header(header::USER_AGENT, user_agent)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub async fn body_to_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Form Fixtures
// =============================================================================

pub fn text_field(name: &str, label: &str, required: bool) -> Field {
    Field {
        id: format!("field-{name}"),
        field_type: "text".to_string(),
        label: label.to_string(),
        name: name.to_string(),
        required,
        config: json!({ "placeholder": label }),
    }
}

pub fn open_form(id: &str) -> Form {
    Form {
        id: id.to_string(),
        user_id: "owner-1".to_string(),
        name: "Customer feedback".to_string(),
        description: Some("Tell us how we did".to_string()),
        status: FormStatus::Active,
        expires_at: None,
        max_responses: None,
        total_responses: 0,
        allow_multiple_submissions: true,
        password_hash: None,
        fields: vec![
            text_field("name", "Full name", true),
            text_field("email", "Email", true),
            text_field("comments", "Comments", false),
        ],
    }
}

pub fn complete_answers() -> Value {
    json!({
        "values": {
            "name": "Ana Souza",
            "email": "ana@example.com",
            "comments": "Great service"
        }
    })
}

/// Minimum bcrypt cost keeps the tests fast
pub fn hash_password(password: &str) -> String {
    bcrypt::hash(password, 4).unwrap()
}

pub fn one_day_ago() -> chrono::DateTime<Utc> {
    Utc::now() - chrono::Duration::days(1)
}

/// Poll until `check` holds; detached tasks get a chance to run between polls
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
