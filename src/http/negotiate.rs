//! Content negotiation helpers
//!
//! Small, exact-match negotiation over `Accept`, `Accept-Language` and
//! `Content-Type`. Quality factors are ignored; ordering in the header is
//! taken as client preference.

use super::request::IncomingRequest;

/// Check whether the request accepts the given media type.
///
/// A missing `Accept` header, or `*/*`, accepts everything. Otherwise the
/// media type must appear verbatim among the comma-separated entries
/// (parameters such as `;q=` are stripped before comparison).
pub fn accepts(req: &IncomingRequest, media_type: &str) -> bool {
    let accept = req.header("accept", "");
    if accept.is_empty() || accept == "*/*" {
        return true;
    }

    accept.split(',').any(|entry| {
        let entry = entry.split(';').next().unwrap_or("").trim();
        entry == media_type || entry == "*/*"
    })
}

pub fn accepts_json(req: &IncomingRequest) -> bool {
    accepts(req, "application/json")
}

pub fn accepts_html(req: &IncomingRequest) -> bool {
    accepts(req, "text/html")
}

/// Split a `Content-Type` value into media type and optional charset
pub fn parse_content_type(value: &str) -> (String, Option<String>) {
    let mut parts = value.split(';').map(str::trim);
    let media_type = parts.next().unwrap_or("").to_string();
    let charset = parts
        .find_map(|p| p.strip_prefix("charset="))
        .map(ToString::to_string);
    (media_type, charset)
}

/// Parse `Accept-Language` into an ordered list of language tags
pub fn parse_accept_language(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|lang| {
            let tag = lang.split(';').next().unwrap_or("").trim();
            if tag.is_empty() {
                None
            } else {
                Some(tag.to_string())
            }
        })
        .collect()
}

/// Pick the client's preferred language among the supported ones.
///
/// Falls back to the first supported language when the client expressed no
/// preference; returns `None` when nothing matches.
pub fn preferred_language<'a>(req: &IncomingRequest, supported: &'a [&'a str]) -> Option<&'a str> {
    let accept_language = req.header("accept-language", "");
    if accept_language.is_empty() {
        return supported.first().copied();
    }

    let preferences = parse_accept_language(&accept_language);
    preferences
        .iter()
        .find_map(|lang| supported.iter().find(|s| **s == lang.as_str()).copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{ConnectionInfo, IncomingRequest};
    use hyper::Method;
    use std::collections::HashMap;

    fn request_with_headers(pairs: &[(&str, &str)]) -> IncomingRequest {
        let headers: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        IncomingRequest::new(Method::GET, "/", headers, ConnectionInfo::default())
    }

    #[test]
    fn missing_accept_header_accepts_anything() {
        let req = request_with_headers(&[]);
        assert!(accepts(&req, "application/json"));
        assert!(accepts_html(&req));
    }

    #[test]
    fn wildcard_accepts_anything() {
        let req = request_with_headers(&[("accept", "*/*")]);
        assert!(accepts_json(&req));
    }

    #[test]
    fn specific_accept_rejects_other_types() {
        let req = request_with_headers(&[("accept", "text/html")]);
        assert!(!accepts(&req, "application/json"));
        assert!(accepts(&req, "text/html"));
    }

    #[test]
    fn accept_list_with_parameters() {
        let req = request_with_headers(&[("accept", "text/html, application/json;q=0.9")]);
        assert!(accepts_json(&req));
        assert!(accepts_html(&req));
        assert!(!accepts(&req, "text/plain"));
    }

    #[test]
    fn content_type_split() {
        assert_eq!(
            parse_content_type("text/html; charset=utf-8"),
            ("text/html".to_string(), Some("utf-8".to_string()))
        );
        assert_eq!(
            parse_content_type("application/json"),
            ("application/json".to_string(), None)
        );
    }

    #[test]
    fn accept_language_ordering() {
        assert_eq!(
            parse_accept_language("zh-CN,zh;q=0.9,en;q=0.8"),
            vec!["zh-CN", "zh", "en"]
        );
    }

    #[test]
    fn preferred_language_picks_first_match() {
        let req = request_with_headers(&[("accept-language", "fr,en;q=0.8")]);
        assert_eq!(preferred_language(&req, &["en", "de"]), Some("en"));

        let no_pref = request_with_headers(&[]);
        assert_eq!(preferred_language(&no_pref, &["en", "de"]), Some("en"));

        let no_match = request_with_headers(&[("accept-language", "ja")]);
        assert_eq!(preferred_language(&no_match, &["en", "de"]), None);
    }
}
