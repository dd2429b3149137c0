/// Cache key prefix for the public-safe form projection
pub const PUBLIC_FORM_CACHE_PREFIX: &str = "public-form:";

/// Key prefix for fixed-window throttle counters
pub const THROTTLE_KEY_PREFIX: &str = "throttle:";

/// Placeholder used when the caller IP or user agent is unknown
pub const UNKNOWN_CLIENT_PART: &str = "unknown";

/// Activity type recorded for the form owner on every accepted submission
pub const ACTIVITY_NEW_RESPONSE: &str = "NEW_RESPONSE";

/// Cache key for the public projection of a form
pub fn public_form_key(form_id: &str) -> String {
    format!("{PUBLIC_FORM_CACHE_PREFIX}{form_id}")
}

/// Counter key for one caller inside one named bucket
pub fn throttle_key(bucket_name: &str, caller_key: &str) -> String {
    format!("{THROTTLE_KEY_PREFIX}{bucket_name}:{caller_key}")
}

// =============================================================================
// User-facing Messages
// =============================================================================

pub const MSG_SUBMISSION_ACCEPTED: &str = "Response submitted successfully. Thank you!";

pub const MSG_FORM_INACTIVE: &str = "This form is not accepting responses";

pub const MSG_FORM_EXPIRED: &str = "This form has expired";

pub const MSG_FORM_FULL: &str = "This form has reached its response limit";

pub const MSG_PASSWORD_REQUIRED: &str = "A password is required to access this form";

pub const MSG_PASSWORD_INVALID: &str = "Incorrect password";

pub const MSG_SUBMISSION_DUPLICATE: &str = "You have already responded to this form";

pub const MSG_RATE_LIMITED: &str = "Too many requests, please try again later";

pub const MSG_METHOD_NOT_ALLOWED: &str = "Method not allowed";

pub const MSG_INTERNAL_ERROR: &str = "Internal server error";
