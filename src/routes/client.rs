use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::models::ClientMeta;
use crate::AppState;

/// First hop of `X-Forwarded-For`, i.e. the original client behind the proxy
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Resolve the caller once so the throttle and the handlers agree on it
pub fn resolve(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy: bool,
) -> ClientMeta {
    let forwarded = if trust_proxy {
        forwarded_ip(headers)
    } else {
        None
    };

    ClientMeta {
        ip: forwarded.or_else(|| peer.map(|addr| addr.ip().to_string())),
        user_agent: user_agent(headers),
    }
}

/// Store the resolved `ClientMeta` in the request extensions
pub async fn resolve_client(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Response {
    let client = resolve(
        request.headers(),
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.trust_proxy,
    );

    request.extensions_mut().insert(client);
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(client) = parts.extensions.get::<ClientMeta>() {
            return Ok(client.clone());
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(resolve(&parts.headers, peer, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_peer_address_without_proxy_trust() {
        let peer: SocketAddr = "192.168.1.9:55000".parse().unwrap();
        let client = resolve(
            &headers(&[("x-forwarded-for", "1.1.1.1"), ("user-agent", "curl/8.0")]),
            Some(peer),
            false,
        );

        assert_eq!(client.ip.as_deref(), Some("192.168.1.9"));
        assert_eq!(client.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_first_forwarded_hop_with_proxy_trust() {
        let peer: SocketAddr = "10.0.0.1:443".parse().unwrap();
        let client = resolve(
            &headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]),
            Some(peer),
            true,
        );

        assert_eq!(client.ip.as_deref(), Some("203.0.113.7"));
        assert!(client.user_agent.is_none());
    }

    #[test]
    fn test_unknown_caller() {
        let client = resolve(&HeaderMap::new(), None, true);
        assert_eq!(client, ClientMeta::default());
    }
}
