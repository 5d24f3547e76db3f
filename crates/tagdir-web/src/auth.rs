//! Caller authorization.

use axum::http::{HeaderMap, header::AUTHORIZATION};

/// Decides whether a request comes from an authorized writer.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, headers: &HeaderMap) -> bool;
}

/// Accepts `Authorization: Bearer <token>` for a single shared admin token.
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authorizer for BearerToken {
    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        if self.token.is_empty() {
            return false;
        }
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|presented| constant_time_eq(presented.trim(), &self.token))
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        let auth = BearerToken::new("s3cret");

        assert!(auth.is_authorized(&headers("Bearer s3cret")));
        assert!(!auth.is_authorized(&headers("Bearer s3cre")));
        assert!(!auth.is_authorized(&headers("Basic s3cret")));
        assert!(!auth.is_authorized(&HeaderMap::new()));
    }

    #[test]
    fn test_empty_token_authorizes_nobody() {
        let auth = BearerToken::new("");
        assert!(!auth.is_authorized(&headers("Bearer ")));
    }
}
