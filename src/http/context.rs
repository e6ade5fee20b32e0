//! Request context
//!
//! One [`IncomingRequest`] plus one [`OutgoingResponse`], exclusively owned
//! by a single in-flight request. Cross-cutting facts that need both halves
//! (freshness) or that middlewares commonly reach for (protocol, client IP,
//! subdomains) are exposed here. Per-request data attached by middleware
//! lives in a typed extension table, never in ad hoc dynamic fields.

use super::fresh::is_fresh;
use super::request::IncomingRequest;
use super::response::OutgoingResponse;
use hyper::http::Extensions;
use hyper::Method;
use serde_json::Value;

/// Shared state for one request/response exchange
#[derive(Debug)]
pub struct RequestContext {
    pub request: IncomingRequest,
    pub response: OutgoingResponse,
    /// Typed per-request storage for middleware (auth claims, timings, ...)
    pub extensions: Extensions,
    /// Value returned by the terminal route handler, if any
    pub result: Option<Value>,
}

impl RequestContext {
    pub fn new(request: IncomingRequest) -> Self {
        Self {
            request,
            response: OutgoingResponse::new(),
            extensions: Extensions::default(),
            result: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    pub fn protocol(&self) -> String {
        self.request.protocol()
    }

    pub fn secure(&self) -> bool {
        self.request.secure()
    }

    pub fn ip(&self) -> String {
        self.request.ip()
    }

    pub fn ips(&self) -> Vec<String> {
        self.request.ips()
    }

    pub fn hostname(&self) -> String {
        self.request.hostname()
    }

    pub fn subdomains(&self) -> Vec<String> {
        self.request.subdomains()
    }

    pub fn xhr(&self) -> bool {
        self.request.is_ajax()
    }

    /// RFC 7232 freshness for the current request/response pair.
    ///
    /// Only GET/HEAD requests with a 2xx or 304 status can be fresh; anything
    /// else is stale by definition.
    pub fn fresh(&self) -> bool {
        let method = &self.request.method;
        if *method != Method::GET && *method != Method::HEAD {
            return false;
        }

        let status = self.response.get_status();
        if !(200..300).contains(&status) && status != 304 {
            return false;
        }

        is_fresh(self.request.headers(), self.response.get_headers())
    }

    pub fn stale(&self) -> bool {
        !self.fresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::ConnectionInfo;
    use std::collections::HashMap;

    fn context(method: Method, header_pairs: &[(&str, &str)]) -> RequestContext {
        let headers: HashMap<String, String> = header_pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RequestContext::new(IncomingRequest::new(
            method,
            "/",
            headers,
            ConnectionInfo::default(),
        ))
    }

    #[test]
    fn fresh_when_etag_matches() {
        let mut ctx = context(Method::GET, &[("if-none-match", "\"v1\"")]);
        ctx.response.header("etag", "\"v1\"");
        assert!(ctx.fresh());
        assert!(!ctx.stale());
    }

    #[test]
    fn stale_when_etag_differs() {
        let mut ctx = context(Method::GET, &[("if-none-match", "\"v1\"")]);
        ctx.response.header("etag", "\"v2\"");
        assert!(!ctx.fresh());
        assert!(ctx.stale());
    }

    #[test]
    fn must_revalidate_wins_over_matching_etag() {
        let mut ctx = context(Method::GET, &[("if-none-match", "\"v1\"")]);
        ctx.response.header("etag", "\"v1\"");
        ctx.response.header("cache-control", "must-revalidate");
        assert!(!ctx.fresh());
    }

    #[test]
    fn non_get_head_methods_are_never_fresh() {
        let mut ctx = context(Method::POST, &[("if-none-match", "\"v1\"")]);
        ctx.response.header("etag", "\"v1\"");
        assert!(!ctx.fresh());
    }

    #[test]
    fn status_gate_allows_2xx_and_304_only() {
        let mut ctx = context(Method::GET, &[("if-none-match", "\"v1\"")]);
        ctx.response.header("etag", "\"v1\"");

        ctx.response.status(304);
        assert!(ctx.fresh());

        ctx.response.status(404);
        assert!(!ctx.fresh());

        ctx.response.status(500);
        assert!(!ctx.fresh());
    }

    #[test]
    fn head_requests_participate_in_freshness() {
        let mut ctx = context(Method::HEAD, &[("if-none-match", "\"v1\"")]);
        ctx.response.header("etag", "\"v1\"");
        assert!(ctx.fresh());
    }

    #[test]
    fn extensions_store_typed_values() {
        #[derive(Debug, Clone, PartialEq)]
        struct TraceId(u64);

        let mut ctx = context(Method::GET, &[]);
        ctx.extensions.insert(TraceId(42));
        assert_eq!(ctx.extensions.get::<TraceId>(), Some(&TraceId(42)));
    }

    #[test]
    fn delegated_accessors() {
        let ctx = context(
            Method::GET,
            &[
                ("host", "api.example.com"),
                ("x-requested-with", "xmlhttprequest"),
            ],
        );
        assert_eq!(ctx.path(), "/");
        assert_eq!(ctx.protocol(), "http");
        assert_eq!(ctx.hostname(), "api.example.com");
        assert_eq!(ctx.subdomains(), vec!["api"]);
        assert!(ctx.xhr());
    }
}
