//! Personal Access Token handling for the Azure DevOps clients.

use azure_devops_rust_api::Credential;
use secrecy::{ExposeSecret, SecretString};

/// Personal Access Token used to authenticate every Azure DevOps client.
///
/// The token stays wrapped in a `SecretString` until the clients are built, and never shows
/// up in `Debug` output.
///
/// # Example
///
/// ```rust
/// use ado_gitter::api::PatCredential;
///
/// let credential = PatCredential::from_string("my-pat".to_string());
/// assert!(format!("{credential:?}").contains("[REDACTED]"));
/// ```
#[derive(Clone)]
pub struct PatCredential {
    pat: SecretString,
}

impl PatCredential {
    pub fn new(pat: SecretString) -> Self {
        Self { pat }
    }

    /// Wraps a plain token in a `SecretString`.
    pub fn from_string(pat: String) -> Self {
        Self {
            pat: SecretString::from(pat),
        }
    }

    /// Whether the token is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pat.expose_secret().trim().is_empty()
    }

    /// Builds the credential handed to the `azure_devops_rust_api` client builders.
    ///
    /// The client crate sends the token with Basic authentication.
    pub fn to_client_credential(&self) -> Credential {
        Credential::from_pat(self.pat.expose_secret().to_string())
    }

    /// `Authorization` header value for requests sent outside the generated clients.
    pub(crate) fn basic_authorization(&self) -> SecretString {
        let encoded = azure_core::base64::encode(format!(":{}", self.pat.expose_secret()));
        SecretString::from(format!("Basic {encoded}"))
    }
}

impl std::fmt::Debug for PatCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatCredential")
            .field("pat", &"[REDACTED]")
            .finish()
    }
}
