//! Cookie handling
//!
//! Inbound: parse the single `Cookie` request header into a name/value map.
//! Outbound: accumulate `Set-Cookie` directives and serialize each one with
//! its attributes in a fixed order: `Expires`, `Max-Age`, `Domain`, `Path`,
//! `Secure`, `HttpOnly`, `SameSite`.

use super::decode_percent_escapes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// `SameSite` cookie attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes attached to one `Set-Cookie` directive
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    pub expires: Option<DateTime<Utc>>,
    /// Lifetime in seconds
    pub max_age: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

/// One accumulated cookie-set directive
#[derive(Debug, Clone)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl SetCookie {
    /// Serialize to a single `Set-Cookie` header value.
    ///
    /// Omitted attributes produce no token; flag attributes (`Secure`,
    /// `HttpOnly`) carry no value.
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        let opts = &self.options;

        if let Some(expires) = opts.expires {
            out.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if let Some(max_age) = opts.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(ref domain) = opts.domain {
            out.push_str(&format!("; Domain={domain}"));
        }
        if let Some(ref path) = opts.path {
            out.push_str(&format!("; Path={path}"));
        }
        if opts.secure {
            out.push_str("; Secure");
        }
        if opts.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(same_site) = opts.same_site {
            out.push_str(&format!("; SameSite={}", same_site.as_str()));
        }

        out
    }
}

/// Parse a `Cookie` request header value into a name/value map.
///
/// Malformed segments (no `=`, empty name) are skipped.
pub fn parse_cookie_header(value: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for segment in value.split(';') {
        let segment = segment.trim();
        if let Some((name, val)) = segment.split_once('=') {
            if !name.is_empty() {
                cookies.insert(decode_percent_escapes(name), decode_percent_escapes(val));
            }
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flags_in_fixed_order() {
        let cookie = SetCookie {
            name: "a".to_string(),
            value: "1".to_string(),
            options: CookieOptions {
                secure: true,
                http_only: true,
                ..CookieOptions::default()
            },
        };
        assert_eq!(cookie.to_header_value(), "a=1; Secure; HttpOnly");
    }

    #[test]
    fn serializes_all_attributes_in_order() {
        let cookie = SetCookie {
            name: "session".to_string(),
            value: "abc".to_string(),
            options: CookieOptions {
                expires: Some(DateTime::UNIX_EPOCH),
                max_age: Some(3600),
                domain: Some("example.com".to_string()),
                path: Some("/".to_string()),
                secure: true,
                http_only: true,
                same_site: Some(SameSite::Lax),
            },
        };
        assert_eq!(
            cookie.to_header_value(),
            "session=abc; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=3600; \
             Domain=example.com; Path=/; Secure; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn bare_cookie_has_no_attribute_tokens() {
        let cookie = SetCookie {
            name: "k".to_string(),
            value: "v".to_string(),
            options: CookieOptions::default(),
        };
        assert_eq!(cookie.to_header_value(), "k=v");
    }

    #[test]
    fn parses_cookie_header() {
        let cookies = parse_cookie_header("a=1; session=xyz; theme=dark");
        assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
        assert_eq!(cookies.get("session").map(String::as_str), Some("xyz"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn skips_malformed_segments() {
        let cookies = parse_cookie_header("valid=1; garbage; =empty");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies.get("valid").map(String::as_str), Some("1"));
    }

    #[test]
    fn decodes_percent_escapes() {
        let cookies = parse_cookie_header("name=hello%20world");
        assert_eq!(
            cookies.get("name").map(String::as_str),
            Some("hello world")
        );
    }

    #[test]
    fn plus_signs_in_values_stay_literal() {
        let cookies = parse_cookie_header("expr=a+b");
        assert_eq!(cookies.get("expr").map(String::as_str), Some("a+b"));
    }
}
