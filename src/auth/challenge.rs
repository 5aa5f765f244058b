//! Challenge rewriting
//!
//! Upstream `WWW-Authenticate` challenges point registry clients at the
//! upstream token service. The rewriter redirects them to this relay's own
//! token endpoint and leaves every other parameter alone.

use axum::http::{header::WWW_AUTHENTICATE, HeaderMap, HeaderValue, Response};

use crate::models::Challenge;

/// Rewrites challenge realms to point at this relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRewriter {
    realm: String,
    service: String,
}

impl ChallengeRewriter {
    /// `realm` is the own token endpoint URL, `service` the own service name
    pub fn new(realm: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            service: service.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Rewrite a response's challenge, keeping status and body untouched
    pub fn rewrite<B>(&self, mut response: Response<B>) -> Response<B> {
        self.rewrite_headers(response.headers_mut());
        response
    }

    /// Rewrite the challenge headers in place
    ///
    /// A missing challenge is synthesized. Values that do not parse as
    /// `<scheme> k=v,...` are left as they are.
    pub fn rewrite_headers(&self, headers: &mut HeaderMap) {
        let values: Vec<HeaderValue> = headers.get_all(WWW_AUTHENTICATE).iter().cloned().collect();

        if values.is_empty() {
            let synthesized = Challenge::bearer(&self.realm, &self.service);
            match HeaderValue::from_str(&synthesized.to_string()) {
                Ok(value) => {
                    headers.insert(WWW_AUTHENTICATE, value);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot encode synthesized challenge");
                }
            }
            return;
        }

        headers.remove(WWW_AUTHENTICATE);
        for value in values {
            headers.append(WWW_AUTHENTICATE, self.rewrite_value(value));
        }
    }

    fn rewrite_value(&self, value: HeaderValue) -> HeaderValue {
        let Some(challenge) = value.to_str().ok().and_then(Challenge::parse) else {
            tracing::debug!(challenge = ?value, "Passing malformed challenge through");
            return value;
        };

        let rewritten = challenge.with_realm(&self.realm).to_string();
        match HeaderValue::from_str(&rewritten) {
            Ok(new_value) => new_value,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot encode rewritten challenge");
                value
            }
        }
    }
}
