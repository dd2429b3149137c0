use axum::http::{Method, Uri};

use crate::error::AppError;

/// Any path no route matches
pub async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::RouteNotFound(format!("{} {}", method, uri.path()))
}

/// A known path hit with a method it does not serve
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
