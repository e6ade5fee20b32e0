//! Outgoing response
//!
//! Accumulates status, headers, cookies and a body, then serializes the
//! whole thing exactly once. Header names are lowercased on write so lookups
//! stay case-insensitive; cookies are kept as an ordered list of directives
//! and only become `Set-Cookie` headers at finalize time, preserving
//! multiplicity.

use super::cookie::{CookieOptions, SetCookie};
use chrono::DateTime;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use serde_json::Value;
use std::collections::HashMap;

/// Response body payload
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    Binary(Bytes),
}

/// Accumulated outbound state for one request
#[derive(Debug)]
pub struct OutgoingResponse {
    status: u16,
    headers: HashMap<String, String>,
    cookies: Vec<SetCookie>,
    body: Body,
    sent: bool,
    finalized: Option<Response<Full<Bytes>>>,
}

impl Default for OutgoingResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl OutgoingResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            cookies: Vec::new(),
            body: Body::Empty,
            sent: false,
            finalized: None,
        }
    }

    /// Set the response status code
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    pub const fn get_status(&self) -> u16 {
        self.status
    }

    /// Set a header (case-insensitive, last write wins)
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.remove(&name.to_lowercase());
        self
    }

    /// All accumulated headers, keyed lowercase
    pub const fn get_headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Set the Content-Type header
    pub fn content_type(&mut self, mime: &str) -> &mut Self {
        self.header("content-type", mime)
    }

    /// Set the body, inferring Content-Type when none is set yet
    pub fn send(&mut self, body: Body) -> &mut Self {
        if self.get_header("content-type").is_none() {
            match &body {
                Body::Text(_) => {
                    self.content_type("text/plain");
                }
                Body::Json(_) => {
                    self.content_type("application/json");
                }
                Body::Binary(_) => {
                    self.content_type("application/octet-stream");
                }
                Body::Empty => {}
            }
        }
        self.body = body;
        self
    }

    /// Send a JSON body
    pub fn json(&mut self, value: Value) -> &mut Self {
        self.content_type("application/json");
        self.body = Body::Json(value);
        self
    }

    /// Send a plain-text body
    pub fn text(&mut self, content: &str) -> &mut Self {
        self.content_type("text/plain");
        self.body = Body::Text(content.to_string());
        self
    }

    /// Send an HTML body
    pub fn html(&mut self, content: &str) -> &mut Self {
        self.content_type("text/html");
        self.body = Body::Text(content.to_string());
        self
    }

    /// Redirect to `url` (302 by default)
    pub fn redirect(&mut self, url: &str, status: Option<u16>) -> &mut Self {
        self.header("location", url);
        self.status(status.unwrap_or(302))
    }

    /// Append a cookie-set directive; serialized at finalize time
    pub fn cookie(&mut self, name: &str, value: &str, options: CookieOptions) -> &mut Self {
        self.cookies.push(SetCookie {
            name: name.to_string(),
            value: value.to_string(),
            options,
        });
        self
    }

    /// Expire a cookie: empty value plus an already-past `Expires`
    pub fn clear_cookie(&mut self, name: &str) -> &mut Self {
        self.cookie(
            name,
            "",
            CookieOptions {
                expires: Some(DateTime::UNIX_EPOCH),
                ..CookieOptions::default()
            },
        )
    }

    /// Accumulated cookie directives in insertion order
    pub fn get_cookies(&self) -> &[SetCookie] {
        &self.cookies
    }

    /// Serialized `Set-Cookie` header values in insertion order
    pub fn get_set_cookie_headers(&self) -> Vec<String> {
        self.cookies.iter().map(SetCookie::to_header_value).collect()
    }

    pub const fn get_content(&self) -> &Body {
        &self.body
    }

    /// Mark the response as a download attachment
    pub fn attachment(&mut self, filename: Option<&str>) -> &mut Self {
        match filename {
            Some(name) => self.header(
                "content-disposition",
                &format!("attachment; filename=\"{name}\""),
            ),
            None => self.header("content-disposition", "attachment"),
        }
    }

    /// Set download headers for a file path.
    ///
    /// Only the headers are produced here; streaming the file itself is a
    /// collaborator's job.
    pub fn download(&mut self, path: &str, filename: Option<&str>) -> &mut Self {
        let name = filename
            .or_else(|| path.rsplit('/').next())
            .unwrap_or(path)
            .to_string();
        self.attachment(Some(&name))
    }

    /// Whether the response has already been finalized
    pub const fn has_responded(&self) -> bool {
        self.sent
    }

    /// Finalize the response: at most once per request.
    ///
    /// Writes the status, all accumulated headers, one `Set-Cookie` header
    /// per directive, and the body in its canonical text form. A second call
    /// is a no-op.
    pub fn end(&mut self) {
        if self.sent {
            return;
        }
        self.sent = true;

        let mut builder = Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for cookie in &self.cookies {
            builder = builder.header("set-cookie", cookie.to_header_value());
        }

        let bytes = match &self.body {
            Body::Empty => Bytes::new(),
            Body::Text(text) => Bytes::from(text.clone()),
            Body::Json(value) => Bytes::from(serde_json::to_vec(value).unwrap_or_default()),
            Body::Binary(data) => data.clone(),
        };

        self.finalized = Some(builder.body(Full::new(bytes)).unwrap_or_else(|_| {
            // A header name/value failed validation; degrade to a bare 500
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        }));
    }

    /// Take the finalized transport response, if `end` has produced one
    pub fn take_finalized(&mut self) -> Option<Response<Full<Bytes>>> {
        self.finalized.take()
    }
}
