//! Incoming request
//!
//! Normalizes transport-level input into a queryable, typed view. Immutable
//! after construction except for the collaborator slots (`body`, `raw_body`,
//! `params`, `files`) which an upstream body parser or router may populate
//! before the pipeline runs.
//!
//! Connection facts (peer address, whether the transport is encrypted) are
//! injected as a plain [`ConnectionInfo`] at construction time, so this type
//! never inspects a concrete socket.

use super::cookie::parse_cookie_header;
use super::percent_decode;
use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Transport facts supplied at connection-accept time
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionInfo {
    pub peer_addr: Option<SocketAddr>,
    /// Whether the underlying connection is encrypted (TLS)
    pub encrypted: bool,
}

/// Descriptor for one uploaded file, populated by an external upload parser
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    /// Where the upload parser stored the file
    pub path: String,
}

/// Structured view of one inbound HTTP request
#[derive(Debug)]
pub struct IncomingRequest {
    pub method: Method,
    /// Raw request target (path plus query string)
    pub url: String,
    pub path: String,
    /// Parsed query parameters; duplicate keys resolve last-wins
    pub query: HashMap<String, String>,
    /// Raw query string without the leading `?`
    pub query_string: String,
    /// Cookies parsed from the `Cookie` header
    pub cookies: HashMap<String, String>,
    /// Parsed body, set by an upstream body-parsing collaborator
    pub body: Option<Value>,
    /// Raw body bytes as received
    pub raw_body: Option<Bytes>,
    /// Route parameters, set by an external router
    pub params: HashMap<String, String>,
    /// Uploaded files by field name, set by an external upload parser
    pub files: HashMap<String, Vec<FileUpload>>,
    headers: HashMap<String, String>,
    conn: ConnectionInfo,
}

impl IncomingRequest {
    /// Build a request from its raw pieces.
    ///
    /// Header names are lowercased on insertion; lookups are therefore
    /// case-insensitive throughout.
    pub fn new(
        method: Method,
        target: &str,
        headers: HashMap<String, String>,
        conn: ConnectionInfo,
    ) -> Self {
        let (path, query_string) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        let path = if path.is_empty() { "/" } else { path };

        let headers: HashMap<String, String> = headers
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();

        let cookies = headers
            .get("cookie")
            .map(|v| parse_cookie_header(v))
            .unwrap_or_default();

        Self {
            method,
            url: target.to_string(),
            path: path.to_string(),
            query: parse_query(query_string),
            query_string: query_string.to_string(),
            cookies,
            body: None,
            raw_body: None,
            params: HashMap::new(),
            files: HashMap::new(),
            headers,
            conn,
        }
    }

    /// Build a request from hyper request parts.
    ///
    /// Only the first value of a repeated header is kept; non-UTF-8 header
    /// values are replaced lossily.
    pub fn from_hyper(parts: &Parts, conn: ConnectionInfo) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();

        let mut headers = HashMap::new();
        for (name, value) in &parts.headers {
            headers
                .entry(name.as_str().to_string())
                .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        Self::new(parts.method.clone(), &target, headers, conn)
    }

    /// All request headers, keyed lowercase
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup with a default
    pub fn header(&self, name: &str, default: &str) -> String {
        self.headers
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// Look up a value in the parsed body, then query, then route params
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(Value::Object(map)) = &self.body {
            if let Some(value) = map.get(key) {
                return Some(value.clone());
            }
        }
        if let Some(value) = self.query.get(key) {
            return Some(Value::String(value.clone()));
        }
        self.params
            .get(key)
            .map(|value| Value::String(value.clone()))
    }

    /// Like [`get`](Self::get), substituting `default` when nothing resolves
    pub fn input(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// First uploaded file for the given field name
    pub fn file(&self, name: &str) -> Option<&FileUpload> {
        self.files.get(name).and_then(|list| list.first())
    }

    pub fn user_agent(&self) -> String {
        self.header("user-agent", "")
    }

    /// XHR detection via `X-Requested-With`
    pub fn is_ajax(&self) -> bool {
        self.header("x-requested-with", "")
            .eq_ignore_ascii_case("xmlhttprequest")
    }

    /// Content-Type substring classifier
    pub fn is(&self, media_type: &str) -> bool {
        self.header("content-type", "").contains(media_type)
    }

    pub fn is_json(&self) -> bool {
        self.is("application/json")
    }

    /// Form submission, urlencoded or multipart
    pub fn is_form(&self) -> bool {
        self.is("application/x-www-form-urlencoded") || self.is("multipart/form-data")
    }

    /// Request protocol: first `X-Forwarded-Proto` entry when present,
    /// otherwise derived from the transport's encryption flag
    pub fn protocol(&self) -> String {
        let forwarded = self.header("x-forwarded-proto", "");
        if !forwarded.is_empty() {
            if let Some(first) = forwarded.split(',').next() {
                return first.trim().to_string();
            }
        }
        if self.conn.encrypted { "https" } else { "http" }.to_string()
    }

    pub fn secure(&self) -> bool {
        self.protocol() == "https"
    }

    /// Forwarded client IP chain from `X-Forwarded-For`; empty when absent
    pub fn ips(&self) -> Vec<String> {
        let forwarded = self.header("x-forwarded-for", "");
        if forwarded.is_empty() {
            return Vec::new();
        }
        forwarded
            .split(',')
            .map(|ip| ip.trim().to_string())
            .collect()
    }

    /// Client IP: head of the forwarded chain, else the raw peer address
    pub fn ip(&self) -> String {
        if let Some(first) = self.ips().into_iter().next() {
            return first;
        }
        self.conn
            .peer_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }

    /// Effective host: first `X-Forwarded-Host` entry, else `Host`
    pub fn hostname(&self) -> String {
        let host = {
            let forwarded = self.header("x-forwarded-host", "");
            if forwarded.is_empty() {
                self.header("host", "")
            } else {
                forwarded
            }
        };
        host.split(',')
            .next()
            .map(str::trim)
            .unwrap_or("")
            .to_string()
    }

    /// Subdomain labels in reverse-DNS order, excluding the registrable
    /// domain (the final two labels)
    pub fn subdomains(&self) -> Vec<String> {
        let hostname = self.hostname();
        if hostname.is_empty() {
            return Vec::new();
        }
        hostname
            .split('.')
            .rev()
            .skip(2)
            .map(ToString::to_string)
            .collect()
    }

    pub fn full_url(&self) -> String {
        format!("{}://{}{}", self.protocol(), self.hostname(), self.url)
    }

    pub const fn connection(&self) -> &ConnectionInfo {
        &self.conn
    }
}

/// Parse a query string into a map; duplicate keys resolve last-wins
fn parse_query(query_string: &str) -> HashMap<String, String> {
    let mut query = HashMap::new();
    for pair in query_string.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            continue;
        }
        query.insert(percent_decode(key), percent_decode(value));
    }
    query
}
