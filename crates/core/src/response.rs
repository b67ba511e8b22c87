//! The captured HTTP response value type.
//!
//! A [`CachedResponse`] is what the store persists and the policy reasons
//! about: status, headers in response order, raw body bytes. It is an
//! explicit value type so stored rows stay inspectable (status and headers
//! land in their own columns rather than one serialized blob).

use std::borrow::Cow;

/// A captured HTTP response: status code, ordered headers, body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// HTTP status code (or 502 for a synthesized transport-fault outcome).
    pub status: u16,
    /// Response headers as ordered name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// Whether this response counts as a success (any 2xx status).
    pub fn is_success(&self) -> bool {
        self.status / 100 == 2
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> CachedResponse {
        CachedResponse { status, headers: Vec::new(), body: Vec::new() }
    }

    #[test]
    fn test_is_success_bounds() {
        assert!(!response(199).is_success());
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(response(299).is_success());
        assert!(!response(300).is_success());
        assert!(!response(404).is_success());
        assert!(!response(503).is_success());
    }

    #[test]
    fn test_body_text_lossy() {
        let resp = CachedResponse { status: 200, headers: Vec::new(), body: vec![0x68, 0x69, 0xff] };
        assert_eq!(resp.body_text(), "hi\u{fffd}");
    }
}
