//! RFC 7232 conditional-GET freshness
//!
//! Decides whether a client's cached representation is still valid, i.e.
//! whether a 304 may be served instead of resending the body. Validators:
//! `If-None-Match` against the response `ETag`, and `If-Modified-Since`
//! against the response `Last-Modified`. A response carrying
//! `Cache-Control: must-revalidate` is never considered fresh, even on an
//! otherwise-matching `ETag`.

use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;

/// Evaluate freshness from request headers against response headers.
///
/// Both maps are expected to be keyed with lowercase header names. The
/// method/status gate (GET/HEAD, 2xx or 304) lives on the request context;
/// this function implements only the header logic.
pub fn is_fresh(
    req_headers: &HashMap<String, String>,
    res_headers: &HashMap<String, String>,
) -> bool {
    let if_modified_since = req_headers.get("if-modified-since");
    let if_none_match = req_headers.get("if-none-match");

    // Unconditional request
    if if_modified_since.is_none() && if_none_match.is_none() {
        return false;
    }

    // must-revalidate on the response forbids serving from cache outright
    if let Some(cache_control) = res_headers.get("cache-control") {
        if cache_control
            .split(',')
            .any(|d| d.trim().eq_ignore_ascii_case("must-revalidate"))
        {
            return false;
        }
    }

    if let Some(none_match) = if_none_match {
        if none_match.trim() != "*" {
            let Some(etag) = res_headers.get("etag") else {
                return false;
            };
            return none_match.split(',').any(|m| m.trim() == etag.as_str());
        }
        // Wildcard matches any representation; the date condition, when
        // present, still has to hold
    }

    if let Some(modified_since) = if_modified_since {
        let Some(last_modified) = res_headers.get("last-modified") else {
            return false;
        };
        return match (parse_http_date(modified_since), parse_http_date(last_modified)) {
            (Some(since), Some(modified)) => since >= modified,
            _ => false,
        };
    }

    // Only reachable for a wildcard if-none-match with no date condition
    true
}

/// Parse an HTTP-date (IMF-fixdate is RFC 2822 compatible, including `GMT`)
fn parse_http_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn unconditional_request_is_stale() {
        assert!(!is_fresh(&headers(&[]), &headers(&[("etag", "\"v1\"")])));
    }

    #[test]
    fn matching_etag_is_fresh() {
        assert!(is_fresh(
            &headers(&[("if-none-match", "\"v1\"")]),
            &headers(&[("etag", "\"v1\"")]),
        ));
    }

    #[test]
    fn mismatched_etag_is_stale() {
        assert!(!is_fresh(
            &headers(&[("if-none-match", "\"v1\"")]),
            &headers(&[("etag", "\"v2\"")]),
        ));
    }

    #[test]
    fn etag_list_matches_any_entry() {
        assert!(is_fresh(
            &headers(&[("if-none-match", "\"v1\", \"v2\"")]),
            &headers(&[("etag", "\"v2\"")]),
        ));
    }

    #[test]
    fn missing_response_etag_is_stale() {
        assert!(!is_fresh(
            &headers(&[("if-none-match", "\"v1\"")]),
            &headers(&[]),
        ));
    }

    #[test]
    fn wildcard_matches_anything() {
        assert!(is_fresh(
            &headers(&[("if-none-match", "*")]),
            &headers(&[]),
        ));
    }

    #[test]
    fn wildcard_still_defers_to_the_date_condition() {
        // Client copy predates the representation: stale despite the wildcard
        assert!(!is_fresh(
            &headers(&[
                ("if-none-match", "*"),
                ("if-modified-since", "Fri, 31 Dec 2021 00:00:00 GMT"),
            ]),
            &headers(&[("last-modified", "Sat, 01 Jan 2022 00:00:00 GMT")]),
        ));
        assert!(is_fresh(
            &headers(&[
                ("if-none-match", "*"),
                ("if-modified-since", "Sat, 01 Jan 2022 00:00:00 GMT"),
            ]),
            &headers(&[("last-modified", "Sat, 01 Jan 2022 00:00:00 GMT")]),
        ));
    }

    #[test]
    fn must_revalidate_overrides_matching_etag() {
        assert!(!is_fresh(
            &headers(&[("if-none-match", "\"v1\"")]),
            &headers(&[("etag", "\"v1\""), ("cache-control", "must-revalidate")]),
        ));
    }

    #[test]
    fn modified_since_at_or_after_last_modified_is_fresh() {
        assert!(is_fresh(
            &headers(&[("if-modified-since", "Sat, 01 Jan 2022 00:00:00 GMT")]),
            &headers(&[("last-modified", "Fri, 31 Dec 2021 00:00:00 GMT")]),
        ));
        // Equal dates count as fresh
        assert!(is_fresh(
            &headers(&[("if-modified-since", "Sat, 01 Jan 2022 00:00:00 GMT")]),
            &headers(&[("last-modified", "Sat, 01 Jan 2022 00:00:00 GMT")]),
        ));
    }

    #[test]
    fn modified_after_client_date_is_stale() {
        assert!(!is_fresh(
            &headers(&[("if-modified-since", "Fri, 31 Dec 2021 00:00:00 GMT")]),
            &headers(&[("last-modified", "Sat, 01 Jan 2022 00:00:00 GMT")]),
        ));
    }

    #[test]
    fn missing_last_modified_is_stale() {
        assert!(!is_fresh(
            &headers(&[("if-modified-since", "Sat, 01 Jan 2022 00:00:00 GMT")]),
            &headers(&[]),
        ));
    }

    #[test]
    fn unparseable_dates_are_stale() {
        assert!(!is_fresh(
            &headers(&[("if-modified-since", "not a date")]),
            &headers(&[("last-modified", "Sat, 01 Jan 2022 00:00:00 GMT")]),
        ));
    }

    #[test]
    fn etag_takes_precedence_over_dates() {
        // if-none-match present and mismatched: stale even with a fresh date pair
        assert!(!is_fresh(
            &headers(&[
                ("if-none-match", "\"v1\""),
                ("if-modified-since", "Sat, 01 Jan 2022 00:00:00 GMT"),
            ]),
            &headers(&[
                ("etag", "\"v2\""),
                ("last-modified", "Fri, 31 Dec 2021 00:00:00 GMT"),
            ]),
        ));
    }
}
