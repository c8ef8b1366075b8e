//! Shared-token authentication for the ingress.
//!
//! The authority token is fetched once at startup and never refreshed.
//! Comparison runs in constant time with respect to the token contents.

use crate::backends::{SecretError, SecretSource};
use subtle::ConstantTimeEq;
use tracing::info;

/// Holds the authority token for the lifetime of the process.
pub struct Authenticator {
    token: Box<[u8]>,
}

impl Authenticator {
    /// Build an authenticator around an already known token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().into_bytes().into_boxed_slice(),
        }
    }

    /// Fetch the token named `parameter` from `source`.
    ///
    /// An empty value is rejected: there is no safe default token.
    pub async fn from_source(
        source: &dyn SecretSource,
        parameter: &str,
    ) -> Result<Self, SecretError> {
        let token = source.fetch(parameter).await?;
        if token.is_empty() {
            return Err(SecretError::Empty(parameter.to_owned()));
        }
        info!(parameter, "Authority token loaded");
        Ok(Self::new(token))
    }

    /// Whether `candidate` equals the authority token. A missing candidate
    /// is never valid.
    pub fn is_valid(&self, candidate: Option<&str>) -> bool {
        match candidate {
            Some(candidate) => candidate.as_bytes().ct_eq(&self.token).into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token", &"<redacted>")
            .finish()
    }
}
