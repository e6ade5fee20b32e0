//! HTTP protocol layer module
//!
//! Structured request/response types plus the protocol helpers they depend
//! on (cookie handling, RFC 7232 freshness, content negotiation). Decoupled
//! from routing and from any concrete transport type.

pub mod context;
pub mod cookie;
pub mod fresh;
pub mod negotiate;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use context::RequestContext;
pub use cookie::{parse_cookie_header, CookieOptions, SameSite, SetCookie};
pub use request::{ConnectionInfo, FileUpload, IncomingRequest};
pub use response::{Body, OutgoingResponse};

/// Decode a percent-encoded query component (`%xx` escapes and `+` as space).
///
/// Invalid escapes are passed through verbatim rather than rejected, matching
/// lenient query-string handling.
pub(crate) fn percent_decode(input: &str) -> String {
    decode_escapes(input, true)
}

/// Decode `%xx` escapes only; `+` stays literal. Cookie values are not
/// form-encoded, so `a+b` must survive the round trip.
pub(crate) fn decode_percent_escapes(input: &str) -> String {
    decode_escapes(input, false)
}

fn decode_escapes(input: &str, plus_as_space: bool) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

const fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_escapes_and_plus() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        assert_eq!(percent_decode("plain"), "plain");
    }

    #[test]
    fn invalid_escapes_pass_through() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%2"), "%2");
    }

    #[test]
    fn escape_only_decoding_keeps_plus_literal() {
        assert_eq!(decode_percent_escapes("a+b"), "a+b");
        assert_eq!(decode_percent_escapes("a%20b"), "a b");
    }
}
