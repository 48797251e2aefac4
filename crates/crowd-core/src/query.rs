//! Convenience builder for HTTP query parameters.
//!
//! Values are percent-escaped individually with form encoding (space becomes `+`) before
//! they are placed into a URL.

use std::fmt::Display;
use url::form_urlencoded;

/// Escapes a string so it can be placed inside a URL query.
#[must_use]
pub fn escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: &'static str, value: Option<T>)
    where
        T: ToString,
    {
        if let Some(value) = value {
            self.pairs.push((key, value.to_string()));
        }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Chainable form of [`QueryParams::push`].
    #[must_use]
    pub fn with<T>(mut self, key: &'static str, value: T) -> Self
    where
        T: Display,
    {
        self.push(key, value);
        self
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Render as `key=value&key=value`, escaping every value.
    #[must_use]
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", escape(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Render as a suffix for an existing query string: each pair prefixed with `&`.
    #[must_use]
    pub fn encode_suffix(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("&{key}={}", escape(value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{escape, QueryParams};

    #[test]
    fn push_opt_skips_none() {
        let mut params = QueryParams::new();
        params.push_opt("name", Option::<String>::None);
        assert!(params.is_empty());
        assert_eq!(params.encode(), "");
        assert_eq!(params.encode_suffix(), "");
    }

    #[test]
    fn encode_preserves_insertion_order() {
        let params = QueryParams::new()
            .with("expand", "group")
            .with("username", "john");
        assert_eq!(params.encode(), "expand=group&username=john");
        assert_eq!(params.encode_suffix(), "&expand=group&username=john");
    }

    #[test]
    fn values_are_escaped() {
        let params = QueryParams::new().with("restriction", "email = a&b@x.io");
        assert_eq!(params.encode(), "restriction=email+%3D+a%26b%40x.io");
    }

    #[test]
    fn escape_handles_reserved_characters() {
        assert_eq!(escape("john smith"), "john+smith");
        assert_eq!(escape("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(escape("plain-name_1.x"), "plain-name_1.x");
        assert_eq!(escape("jörg"), "j%C3%B6rg");
    }
}
