//! Authorization modes and the credentials that back them.
//!
//! Every data API call names the strategy it authenticates with. The mode
//! travels in `x-auth-mode`; its credential travels in the header the mode
//! dictates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const AUTH_MODE_HEADER: &str = "x-auth-mode";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const INFRA_CREDENTIAL_HEADER: &str = "x-infra-credential";

/// Credential strategy used to authenticate a data API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMode {
    /// Signed-in end user session.
    #[default]
    UserPool,
    /// Static API key.
    ApiKey,
    /// Infrastructure credential held by backend functions and operators.
    Iam,
}

impl AuthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthMode::UserPool => "userPool",
            AuthMode::ApiKey => "apiKey",
            AuthMode::Iam => "iam",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown auth mode `{0}` (expected userPool, apiKey or iam)")]
pub struct ParseAuthModeError(pub String);

impl FromStr for AuthMode {
    type Err = ParseAuthModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "userPool" | "user-pool" => Ok(AuthMode::UserPool),
            "apiKey" | "api-key" => Ok(AuthMode::ApiKey),
            "iam" => Ok(AuthMode::Iam),
            other => Err(ParseAuthModeError(other.to_string())),
        }
    }
}

/// Secrets for each auth mode. A mode whose credential is absent cannot be
/// used.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub user_token: Option<String>,
    pub api_key: Option<String>,
    pub infra_credential: Option<String>,
}

impl Credentials {
    /// Headers that authenticate a request under `mode`.
    pub fn headers_for(&self, mode: AuthMode) -> Result<Vec<(String, String)>, ApiError> {
        let credential = match mode {
            AuthMode::UserPool => self
                .user_token
                .as_deref()
                .map(|token| ("authorization", format!("Bearer {token}"))),
            AuthMode::ApiKey => self
                .api_key
                .as_deref()
                .map(|key| (API_KEY_HEADER, key.to_string())),
            AuthMode::Iam => self
                .infra_credential
                .as_deref()
                .map(|credential| (INFRA_CREDENTIAL_HEADER, credential.to_string())),
        };
        let (name, value) = credential
            .filter(|(_, value)| !value.trim().is_empty())
            .ok_or(ApiError::MissingCredential(mode))?;

        Ok(vec![
            (AUTH_MODE_HEADER.to_string(), mode.as_str().to_string()),
            (name.to_string(), value),
        ])
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("user_token", &redact(&self.user_token))
            .field("api_key", &redact(&self.api_key))
            .field("infra_credential", &redact(&self.infra_credential))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_user_session() {
        assert_eq!(AuthMode::default(), AuthMode::UserPool);
    }

    #[test]
    fn auth_mode_parses_both_spellings() {
        assert_eq!("apiKey".parse::<AuthMode>().unwrap(), AuthMode::ApiKey);
        assert_eq!("user-pool".parse::<AuthMode>().unwrap(), AuthMode::UserPool);
        assert!("oidc".parse::<AuthMode>().is_err());
    }

    #[test]
    fn user_pool_sends_bearer_token() {
        let credentials = Credentials {
            user_token: Some("tok".to_string()),
            ..Credentials::default()
        };
        let headers = credentials.headers_for(AuthMode::UserPool).unwrap();
        assert_eq!(
            headers,
            vec![
                ("x-auth-mode".to_string(), "userPool".to_string()),
                ("authorization".to_string(), "Bearer tok".to_string()),
            ]
        );
    }

    #[test]
    fn missing_credential_is_rejected() {
        let credentials = Credentials {
            api_key: Some("  ".to_string()),
            ..Credentials::default()
        };
        let err = credentials.headers_for(AuthMode::ApiKey).unwrap_err();
        assert!(matches!(err, ApiError::MissingCredential(AuthMode::ApiKey)));
        assert!(credentials.headers_for(AuthMode::Iam).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials {
            infra_credential: Some("s3cret".to_string()),
            ..Credentials::default()
        };
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
