use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Which remote cache adapter this process talks to
#[derive(Debug, Clone)]
pub enum CacheSettings {
    /// Managed cache reached over HTTPS request/response calls
    Rest { url: String, token: String },
    /// Persistent connection with automatic reconnect
    Redis {
        url: String,
        max_retries: usize,
        connect_timeout: Duration,
    },
}

impl CacheSettings {
    pub fn backend_name(&self) -> &'static str {
        match self {
            CacheSettings::Rest { .. } => "rest",
            CacheSettings::Redis { .. } => "redis",
        }
    }
}

/// Window and limit of one named throttle bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleBucket {
    pub name: &'static str,
    pub window_ms: u64,
    pub limit: u64,
}

impl ThrottleBucket {
    pub const fn new(name: &'static str, window_ms: u64, limit: u64) -> Self {
        Self {
            name,
            window_ms,
            limit,
        }
    }
}

/// Every named bucket. Each call class gets its own budget so one abusive
/// flow cannot exhaust another's.
#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    pub default: ThrottleBucket,
    pub auth_register: ThrottleBucket,
    pub auth_login: ThrottleBucket,
    pub auth_forgot: ThrottleBucket,
    pub form_validate: ThrottleBucket,
    pub form_submit: ThrottleBucket,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            default: ThrottleBucket::new("default", 60_000, 10),
            auth_register: ThrottleBucket::new("auth-register", 60_000, 3),
            auth_login: ThrottleBucket::new("auth-login", 60_000, 5),
            auth_forgot: ThrottleBucket::new("auth-forgot", 3_600_000, 3),
            form_validate: ThrottleBucket::new("form-validate", 60_000, 5),
            form_submit: ThrottleBucket::new("form-submit", 60_000, 3),
        }
    }
}

impl ThrottlePolicy {
    /// Apply `THROTTLE_<BUCKET>_LIMIT` / `THROTTLE_<BUCKET>_WINDOW_MS` overrides
    fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            default: bucket_from_env(defaults.default)?,
            auth_register: bucket_from_env(defaults.auth_register)?,
            auth_login: bucket_from_env(defaults.auth_login)?,
            auth_forgot: bucket_from_env(defaults.auth_forgot)?,
            form_validate: bucket_from_env(defaults.form_validate)?,
            form_submit: bucket_from_env(defaults.form_submit)?,
        })
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub trust_proxy: bool,
    pub cache: CacheSettings,
    pub cache_timeout: Duration,
    pub public_form_cache_ttl: Duration,
    pub throttle: ThrottlePolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = parse_var("SERVER_PORT", 3333)?;

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10)?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let trust_proxy = parse_var("TRUST_PROXY", false)?;

        let cache = cache_settings_from_env()?;
        let cache_timeout = Duration::from_millis(parse_var("CACHE_TIMEOUT_MS", 1500)?);
        let public_form_cache_ttl =
            Duration::from_secs(parse_var("PUBLIC_FORM_CACHE_TTL_SECS", 600)?);

        let throttle = ThrottlePolicy::from_env()?;

        Ok(Config {
            server_host,
            server_port,
            database_url,
            database_max_connections,
            allowed_origins,
            environment,
            trust_proxy,
            cache,
            cache_timeout,
            public_form_cache_ttl,
            throttle,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// REST adapter wins when both Upstash variables are present, then `REDIS_URL`.
/// Having neither is an error: the rate limiter cannot run without a backend.
fn cache_settings_from_env() -> Result<CacheSettings, String> {
    let rest_url = env::var("UPSTASH_REDIS_REST_URL").ok();
    let rest_token = env::var("UPSTASH_REDIS_REST_TOKEN").ok();

    if let (Some(url), Some(token)) = (rest_url, rest_token) {
        return Ok(CacheSettings::Rest { url, token });
    }

    if let Ok(url) = env::var("REDIS_URL") {
        return Ok(CacheSettings::Redis {
            url,
            max_retries: parse_var("REDIS_MAX_RETRIES", 3)?,
            connect_timeout: Duration::from_millis(parse_var("REDIS_CONNECT_TIMEOUT_MS", 2000)?),
        });
    }

    Err("Cache configuration required: either UPSTASH_REDIS_REST_URL + \
         UPSTASH_REDIS_REST_TOKEN or REDIS_URL"
        .to_string())
}

fn bucket_from_env(bucket: ThrottleBucket) -> Result<ThrottleBucket, String> {
    let prefix = format!("THROTTLE_{}", env_suffix(bucket.name));
    Ok(ThrottleBucket {
        name: bucket.name,
        window_ms: parse_var(&format!("{prefix}_WINDOW_MS"), bucket.window_ms)?,
        limit: parse_var(&format!("{prefix}_LIMIT"), bucket.limit)?,
    })
}

/// `form-submit` -> `FORM_SUBMIT`
fn env_suffix(bucket_name: &str) -> String {
    bucket_name.replace('-', "_").to_ascii_uppercase()
}

fn parse_var<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}
