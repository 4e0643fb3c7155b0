//! PAT-based credential for Azure DevOps.
//!
//! Azure DevOps accepts a Personal Access Token as the password of HTTP Basic
//! authentication with an empty user name. The same header is used for REST
//! calls and, through `http.extraHeader`, for git smart HTTP.

use base64::Engine;
use reqwest::header::{HeaderValue, InvalidHeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// PAT-based credential for Azure DevOps authentication.
///
/// # Example
///
/// ```rust
/// use ado_migrator::api::PatCredential;
/// use secrecy::SecretString;
///
/// let credential = PatCredential::new(SecretString::from("your-pat-token".to_string()));
/// assert!(format!("{:?}", credential).contains("[REDACTED]"));
/// ```
#[derive(Clone)]
pub struct PatCredential {
    pat: SecretString,
}

impl PatCredential {
    /// Creates a new PAT credential from a SecretString.
    pub fn new(pat: SecretString) -> Self {
        Self { pat }
    }

    /// Creates a new PAT credential from a plain string.
    pub fn from_string(pat: String) -> Self {
        Self {
            pat: SecretString::from(pat),
        }
    }

    fn basic_value(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!(":{}", self.pat.expose_secret()));
        format!("Basic {}", encoded)
    }

    /// `Authorization` header value, marked sensitive so it never shows up in
    /// debug output.
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&self.basic_value())?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Full `Authorization: Basic ...` line for git's `http.extraHeader`.
    pub fn git_extra_header(&self) -> SecretString {
        SecretString::from(format!("Authorization: {}", self.basic_value()))
    }
}

impl std::fmt::Debug for PatCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatCredential")
            .field("pat", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # PatCredential Redaction
    ///
    /// Tests that PatCredential never prints the token.
    ///
    /// ## Test Scenario
    /// - Creates credentials from a SecretString and from a plain string
    ///
    /// ## Expected Outcome
    /// - Debug output shows [REDACTED] only
    #[test]
    fn test_pat_credential_redaction() {
        let credential = PatCredential::new(SecretString::from("test-pat".to_string()));
        let debug = format!("{:?}", credential);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-pat"));

        let credential = PatCredential::from_string("other-pat".to_string());
        assert!(!format!("{:?}", credential).contains("other-pat"));
    }

    /// # Basic Authorization Header
    ///
    /// Tests the header built from the PAT.
    ///
    /// ## Test Scenario
    /// - Builds the REST header and the git extra header for "pat"
    ///
    /// ## Expected Outcome
    /// - Both carry base64(":pat") and the REST header is sensitive
    #[test]
    fn test_basic_authorization_header() {
        let credential = PatCredential::from_string("pat".to_string());

        let header = credential.header_value().unwrap();
        assert!(header.is_sensitive());
        // base64(":pat") == "OnBhdA=="
        assert_eq!(header.to_str().unwrap(), "Basic OnBhdA==");

        assert_eq!(
            credential.git_extra_header().expose_secret(),
            "Authorization: Basic OnBhdA=="
        );
    }
}
