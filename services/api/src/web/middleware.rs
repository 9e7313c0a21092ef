//! services/api/src/web/middleware.rs
//!
//! Request metadata middleware for the form endpoints.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use care_training_core::RequestContext;

fn header_value(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Builds the anti-bot request context from the headers and the peer address.
pub fn request_context_from_headers(headers: &HeaderMap, remote_addr: Option<String>) -> RequestContext {
    RequestContext {
        x_forwarded_for: header_value(headers, "x-forwarded-for"),
        client_ip: header_value(headers, "client-ip"),
        remote_addr,
        user_agent: header_value(headers, header::USER_AGENT),
        referrer: header_value(headers, header::REFERER),
    }
}

/// Middleware that captures the request metadata and inserts a `RequestContext`
/// into the request extensions for the handlers to use.
pub async fn capture_request_context(mut req: Request, next: Next) -> Response {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let context = request_context_from_headers(req.headers(), remote_addr);
    req.extensions_mut().insert(context);

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_forwarding_and_browser_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4, 10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://example.com/book"));
        headers.insert("client-ip", HeaderValue::from_static(" "));

        let context = request_context_from_headers(&headers, Some("10.0.0.2".into()));

        assert_eq!(context.client_ip, None);
        assert_eq!(context.client_ip(), "198.51.100.4");
        assert_eq!(context.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(context.referrer.as_deref(), Some("https://example.com/book"));
    }
}
