use sha2::{Digest, Sha256};

use crate::constants::UNKNOWN_CLIENT_PART;
use crate::error::Result;

// =============================================================================
// Visitor Fingerprint
// =============================================================================

/// Derive a stable identity for an anonymous visitor
///
/// Used both to deduplicate views and to detect repeat submissions. It only
/// needs to be deterministic with a low collision rate; it is not a secret.
///
/// # Algorithm
/// `fingerprint = hex(SHA256("{ip}-{user_agent}"))`, with a missing part
/// replaced by `unknown`.
pub fn visitor_fingerprint(ip: Option<&str>, user_agent: Option<&str>) -> String {
    let ip = ip.filter(|s| !s.is_empty()).unwrap_or(UNKNOWN_CLIENT_PART);
    let user_agent = user_agent
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_CLIENT_PART);

    let mut hasher = Sha256::new();
    hasher.update(format!("{ip}-{user_agent}").as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Form Passwords
// =============================================================================

/// Compare a candidate password against a stored bcrypt hash
///
/// bcrypt is deliberately slow, so the comparison runs on the blocking pool.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();

    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(valid)
}
