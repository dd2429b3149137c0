pub mod client;
pub mod fallback;
pub mod health;
pub mod public_forms;

pub use client::resolve_client;
pub use fallback::{method_not_allowed, route_not_found};
pub use health::health_check;
pub use public_forms::{get_public_form, submit_response, validate_password};
