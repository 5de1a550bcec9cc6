// src/middleware/audit_context.rs

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::models::pricing::AuditContext;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// X-Forwarded-For pode trazer a cadeia de proxies: o primeiro é o cliente.
pub fn audit_context_from_headers(headers: &HeaderMap) -> AuditContext {
    let ip_address = header_str(headers, FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(|ip| ip.trim().to_string())
        .or_else(|| header_str(headers, REAL_IP).map(str::to_string));

    AuditContext {
        ip_address,
        user_agent: header_str(headers, header::USER_AGENT.as_str()).map(str::to_string),
    }
}

impl<S> FromRequestParts<S> for AuditContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(audit_context_from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn first_forwarded_address_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.7, 10.0.0.2"));
        headers.insert(REAL_IP, HeaderValue::from_static("10.0.0.9"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let ctx = audit_context_from_headers(&headers);
        assert_eq!(ctx.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP, HeaderValue::from_static("10.0.0.9"));
        let ctx = audit_context_from_headers(&headers);
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.9"));
        assert_eq!(ctx.user_agent, None);
    }
}
