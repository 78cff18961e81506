//! Small validated primitives shared by the upstream clients and the lab services.

/// Rejected input of the validated types of this crate.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("text is empty")]
    Empty,
    /// Not an absolute http(s) URL.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

/// Trimmed text with at least one character: patient names, note bodies, identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trim `input`; blank input is [`TextError::Empty`].
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        match input.as_ref().trim() {
            "" => Err(TextError::Empty),
            text => Ok(Self(text.to_owned())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NonEmptyText::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Root URL of an upstream REST API.
///
/// Stored without a trailing slash so that paths can be appended with `format!("{}/...")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(TextError::InvalidUrl(trimmed.to_owned()));
        }
        let without_slash = trimmed.strip_suffix('/').unwrap_or(trimmed);
        Ok(Self(without_slash.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append an absolute path (starting with `/`) to the base URL.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Username/password pair used for HTTP basic authentication against an upstream.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Hello  ").expect("should accept");
        assert_eq!(text.as_str(), "Hello");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn non_empty_text_deserialisation_validates() {
        let ok: NonEmptyText = serde_json::from_str("\"abc\"").expect("valid");
        assert_eq!(ok.as_str(), "abc");
        assert!(serde_json::from_str::<NonEmptyText>("\"  \"").is_err());
    }

    #[test]
    fn base_url_strips_single_trailing_slash() {
        let url = BaseUrl::parse("http://localhost:8001/ehrbase/rest/").expect("valid");
        assert_eq!(url.as_str(), "http://localhost:8001/ehrbase/rest");
        assert_eq!(
            url.join("/openehr/v1/ehr"),
            "http://localhost:8001/ehrbase/rest/openehr/v1/ehr"
        );
    }

    #[test]
    fn base_url_rejects_non_http() {
        assert!(matches!(
            BaseUrl::parse("ftp://example.org"),
            Err(TextError::InvalidUrl(_))
        ));
        assert!(matches!(BaseUrl::parse(""), Err(TextError::Empty)));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = BasicCredentials::new("admin", "Admin123");
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("Admin123"));
    }
}
