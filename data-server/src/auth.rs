//! Declarative auth and data-access configuration, plus request checks.
//!
//! `AuthConfig` describes the user pool: how users sign in, which profile
//! attributes they carry, the groups that exist and which backend functions
//! may read user records. `DataRules` says which auth modes may read or write
//! each entity. Both are plain values handed to [`crate::app`].

use std::collections::BTreeMap;
use std::fmt;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const AUTH_MODE_HEADER: &str = "x-auth-mode";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const INFRA_CREDENTIAL_HEADER: &str = "x-infra-credential";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMode {
    UserPool,
    ApiKey,
    Iam,
}

impl AuthMode {
    fn from_header(value: &str) -> Option<Self> {
        match value {
            "userPool" => Some(AuthMode::UserPool),
            "apiKey" => Some(AuthMode::ApiKey),
            "iam" => Some(AuthMode::Iam),
            _ => None,
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthMode::UserPool => "userPool",
            AuthMode::ApiKey => "apiKey",
            AuthMode::Iam => "iam",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Entity {
    Listing,
    OrderItem,
    Todo,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Listing => "listings",
            Entity::OrderItem => "order items",
            Entity::Todo => "todos",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Access::Read => "read",
            Access::Write => "write",
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRule {
    pub entity: Entity,
    pub read: Vec<AuthMode>,
    pub write: Vec<AuthMode>,
}

/// Which auth modes may touch which entity.
#[derive(Clone, Debug, Serialize)]
pub struct DataRules {
    pub rules: Vec<EntityRule>,
}

impl Default for DataRules {
    fn default() -> Self {
        use AuthMode::{ApiKey, Iam, UserPool};
        Self {
            rules: vec![
                EntityRule {
                    entity: Entity::Listing,
                    read: vec![UserPool, ApiKey, Iam],
                    write: vec![UserPool, Iam],
                },
                EntityRule {
                    entity: Entity::OrderItem,
                    read: vec![UserPool, Iam],
                    write: vec![UserPool, Iam],
                },
                EntityRule {
                    entity: Entity::Todo,
                    read: vec![ApiKey],
                    write: vec![ApiKey],
                },
            ],
        }
    }
}

impl DataRules {
    pub fn allows(&self, entity: Entity, access: Access, mode: AuthMode) -> bool {
        self.rules
            .iter()
            .filter(|rule| rule.entity == entity)
            .any(|rule| match access {
                Access::Read => rule.read.contains(&mode),
                Access::Write => rule.write.contains(&mode),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginMethod {
    Email,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttribute {
    pub name: String,
    pub required: bool,
    pub mutable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    ReadUsers,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionGrant {
    pub function: String,
    pub permissions: Vec<Permission>,
}

/// User pool configuration. Contains no secrets; served as-is to clients.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub login_with: LoginMethod,
    pub user_attributes: Vec<UserAttribute>,
    pub groups: Vec<String>,
    pub function_access: Vec<FunctionGrant>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let attribute = |name: &str| UserAttribute {
            name: name.to_string(),
            required: true,
            mutable: true,
        };
        Self {
            login_with: LoginMethod::Email,
            user_attributes: vec![attribute("given_name"), attribute("family_name")],
            groups: vec!["ADMINS".to_string()],
            function_access: vec![FunctionGrant {
                function: "post-confirmation".to_string(),
                permissions: vec![Permission::ReadUsers],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

/// A signed-up user as seen through their session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub email: String,
    pub attributes: BTreeMap<String, String>,
}

const MIN_PASSWORD_LEN: usize = 8;

impl AuthConfig {
    /// Check a sign-up request against the pool's login method and
    /// attribute schema.
    pub fn validate_sign_up(&self, sign_up: &SignUp) -> Result<(), AppError> {
        match self.login_with {
            LoginMethod::Email => {
                if !looks_like_email(&sign_up.email) {
                    return Err(AppError::Validation(format!(
                        "`{}` is not an email address",
                        sign_up.email
                    )));
                }
            }
        }
        if sign_up.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        for attribute in self.user_attributes.iter().filter(|a| a.required) {
            let present = sign_up
                .attributes
                .get(&attribute.name)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(AppError::Validation(format!(
                    "attribute `{}` is required",
                    attribute.name
                )));
            }
        }
        if let Some(unknown) = sign_up
            .attributes
            .keys()
            .find(|name| !self.user_attributes.iter().any(|a| &a.name == *name))
        {
            return Err(AppError::Validation(format!("unknown attribute `{unknown}`")));
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// What a request claims to be: an auth mode plus the credential offered.
#[derive(Debug)]
pub struct Claim {
    pub mode: AuthMode,
    pub credential: String,
}

impl Claim {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

        let mode = header(AUTH_MODE_HEADER)
            .and_then(AuthMode::from_header)
            .ok_or_else(|| AppError::Unauthenticated("missing or unknown x-auth-mode".to_string()))?;

        let credential = match mode {
            AuthMode::UserPool => header("authorization").and_then(|v| v.strip_prefix("Bearer ")),
            AuthMode::ApiKey => header(API_KEY_HEADER),
            AuthMode::Iam => header(INFRA_CREDENTIAL_HEADER),
        }
        .filter(|credential| !credential.is_empty())
        .ok_or_else(|| AppError::Unauthenticated(format!("no credential for auth mode {mode}")))?;

        Ok(Self {
            mode,
            credential: credential.to_string(),
        })
    }
}
