//! `WWW-Authenticate` challenge model
//!
//! A challenge is kept as an ordered list of parameters so that rewriting one
//! parameter leaves every other one where it was.

use std::fmt;

/// A parsed `<scheme> k="v",k="v"` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Authentication scheme (e.g. `Bearer`)
    pub scheme: String,

    /// Parameters in first-seen order
    pub params: Vec<(String, String)>,
}

impl Challenge {
    /// Create a challenge with no parameters
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            params: Vec::new(),
        }
    }

    /// Create a `Bearer` challenge carrying `realm` and `service`
    pub fn bearer(realm: impl Into<String>, service: impl Into<String>) -> Self {
        let mut challenge = Self::new("Bearer");
        challenge.set("realm", realm);
        challenge.set("service", service);
        challenge
    }

    /// Parse a challenge header value
    ///
    /// Returns `None` when the value has no space separating scheme and
    /// parameters, or no `key=value` parameter at all. Segments without `=`
    /// are dropped. Commas inside quoted values do not split parameters.
    ///
    /// # Example
    ///
    /// ```
    /// use registry_auth_relay::models::Challenge;
    ///
    /// let challenge = Challenge::parse(r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io""#).unwrap();
    /// assert_eq!(challenge.scheme, "Bearer");
    /// assert_eq!(challenge.get("service"), Some("registry.docker.io"));
    /// ```
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, rest) = header.trim().split_once(' ')?;
        if scheme.is_empty() || rest.trim().is_empty() {
            return None;
        }

        let mut challenge = Self::new(scheme);
        for segment in split_params(rest) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            challenge.set(key, unquote(value.trim()));
        }

        if challenge.params.is_empty() {
            return None;
        }

        Some(challenge)
    }

    /// Look up a parameter (case-insensitive key)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a parameter, keeping its position when it already exists
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .params
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
    }

    /// Replace (or append) the realm
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.set("realm", realm);
        self
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scheme)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { " " } else { "," };
            write!(f, "{}{}=\"{}\"", sep, key, value)?;
        }
        Ok(())
    }
}

/// Split on commas that are not inside double quotes
fn split_params(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCKER_HUB: &str = r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io""#;

    #[test]
    fn test_parse_docker_hub_challenge() {
        let challenge = Challenge::parse(DOCKER_HUB).unwrap();

        assert_eq!(challenge.scheme, "Bearer");
        assert_eq!(
            challenge.params,
            vec![
                ("realm".to_string(), "https://auth.docker.io/token".to_string()),
                ("service".to_string(), "registry.docker.io".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_trims_whitespace_and_quotes() {
        let challenge = Challenge::parse(r#"Bearer realm = "a" , service=b "#).unwrap();

        assert_eq!(challenge.get("realm"), Some("a"));
        assert_eq!(challenge.get("service"), Some("b"));
    }

    #[test]
    fn test_parse_keeps_commas_inside_quotes() {
        let challenge =
            Challenge::parse(r#"Bearer realm="r",scope="repository:app:pull,push""#).unwrap();

        assert_eq!(challenge.get("scope"), Some("repository:app:pull,push"));
        assert_eq!(challenge.params.len(), 2);
    }

    #[test]
    fn test_parse_duplicate_key_keeps_first_position() {
        let challenge = Challenge::parse(r#"Bearer realm="a",service="s",realm="b""#).unwrap();

        assert_eq!(
            challenge.params,
            vec![
                ("realm".to_string(), "b".to_string()),
                ("service".to_string(), "s".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(Challenge::parse("Bearer"), None);
        assert_eq!(Challenge::parse(""), None);
        assert_eq!(Challenge::parse("Bearer   "), None);
        assert_eq!(Challenge::parse("Bearer token68value"), None);
        assert_eq!(Challenge::parse(r#"Bearer ="x""#), None);
    }

    #[test]
    fn test_parse_drops_segments_without_value() {
        let challenge = Challenge::parse(
            r#"Bearer realm="https://auth.docker.io/token",error,service="registry.docker.io",=x"#,
        )
        .unwrap();

        assert_eq!(
            challenge.params,
            vec![
                ("realm".to_string(), "https://auth.docker.io/token".to_string()),
                ("service".to_string(), "registry.docker.io".to_string()),
            ]
        );
    }

    #[test]
    fn test_display_quotes_every_value() {
        let challenge = Challenge::parse(r#"Bearer realm=a,service="b""#).unwrap();

        assert_eq!(challenge.to_string(), r#"Bearer realm="a",service="b""#);
    }

    #[test]
    fn test_with_realm_replaces_in_place() {
        let challenge = Challenge::parse(
            r#"Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:library/ubuntu:pull""#,
        )
        .unwrap()
        .with_realm("https://proxy.example.com/v2/auth");

        assert_eq!(
            challenge.to_string(),
            r#"Bearer realm="https://proxy.example.com/v2/auth",service="registry.example.com",scope="repository:library/ubuntu:pull""#
        );
    }

    #[test]
    fn test_with_realm_appends_when_missing() {
        let challenge = Challenge::parse(r#"Bearer service="registry.example.com""#)
            .unwrap()
            .with_realm("https://proxy.example.com/v2/auth");

        assert_eq!(
            challenge.to_string(),
            r#"Bearer service="registry.example.com",realm="https://proxy.example.com/v2/auth""#
        );
    }

    #[test]
    fn test_bearer_constructor() {
        let challenge = Challenge::bearer("https://proxy.example.com/v2/auth", "docker-image-proxy");

        assert_eq!(
            challenge.to_string(),
            r#"Bearer realm="https://proxy.example.com/v2/auth",service="docker-image-proxy""#
        );
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let challenge = Challenge::parse(r#"Basic Realm="registry""#).unwrap();

        assert_eq!(challenge.get("realm"), Some("registry"));
    }
}
