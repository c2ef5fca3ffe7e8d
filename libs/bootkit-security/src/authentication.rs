use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AuthenticationError;

pub const ANONYMOUS_PRINCIPAL: &str = "anonymousUser";
pub const ROLE_ANONYMOUS: &str = "ROLE_ANONYMOUS";

/// How the current principal was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationKind {
    Bearer,
    Form,
    Basic,
    RememberMe,
    Session,
    Anonymous,
}

/// The authenticated principal of a request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub principal: String,
    pub authorities: Vec<String>,
    /// Tenant the principal acts for, if any.
    pub tenant: Option<String>,
    pub kind: AuthenticationKind,
}

impl Authentication {
    #[must_use]
    pub fn new(principal: impl Into<String>, kind: AuthenticationKind) -> Self {
        Self {
            principal: principal.into(),
            authorities: Vec::new(),
            tenant: None,
            kind,
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            principal: ANONYMOUS_PRINCIPAL.to_owned(),
            authorities: vec![ROLE_ANONYMOUS.to_owned()],
            tenant: None,
            kind: AuthenticationKind::Anonymous,
        }
    }

    #[must_use]
    pub fn with_authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities = authorities.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.kind == AuthenticationKind::Anonymous
    }

    #[must_use]
    pub fn has_any_authority(&self, wanted: &[String]) -> bool {
        self.authorities.iter().any(|a| wanted.contains(a))
    }

    #[must_use]
    pub fn from_user(user: &UserDetails, kind: AuthenticationKind) -> Self {
        Self {
            principal: user.username.clone(),
            authorities: user.authorities.clone(),
            tenant: user.tenant.clone(),
            kind,
        }
    }
}

/// Stored account as seen by the login filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub username: String,
    /// Encoded password, checked through a [`PasswordEncoder`].
    pub password: String,
    #[serde(default)]
    pub authorities: Vec<String>,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl UserDetails {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            authorities: Vec::new(),
            tenant: None,
            enabled: true,
        }
    }

    #[must_use]
    pub fn with_authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities = authorities.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }
}

/// Loads accounts by username.
#[async_trait]
pub trait UserDetailsService: Send + Sync {
    /// `Ok(None)` when the user does not exist.
    ///
    /// # Errors
    /// Backend failures.
    async fn load_user(&self, username: &str) -> Result<Option<UserDetails>, AuthenticationError>;
}

/// Fixed set of accounts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDetailsService {
    users: HashMap<String, UserDetails>,
}

impl InMemoryUserDetailsService {
    #[must_use]
    pub fn new<I: IntoIterator<Item = UserDetails>>(users: I) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|u| (u.username.clone(), u))
                .collect(),
        }
    }
}

#[async_trait]
impl UserDetailsService for InMemoryUserDetailsService {
    async fn load_user(&self, username: &str) -> Result<Option<UserDetails>, AuthenticationError> {
        Ok(self.users.get(username).cloned())
    }
}

/// Checks raw passwords against stored ones.
pub trait PasswordEncoder: Send + Sync {
    fn encode(&self, raw: &str) -> String;

    fn matches(&self, raw: &str, encoded: &str) -> bool;
}

/// Stores passwords as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpPasswordEncoder;

impl PasswordEncoder for NoOpPasswordEncoder {
    fn encode(&self, raw: &str) -> String {
        raw.to_owned()
    }

    fn matches(&self, raw: &str, encoded: &str) -> bool {
        raw == encoded
    }
}

/// Hex-encoded SHA-256 digest.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256PasswordEncoder;

impl PasswordEncoder for Sha256PasswordEncoder {
    fn encode(&self, raw: &str) -> String {
        hex::encode(Sha256::digest(raw.as_bytes()))
    }

    fn matches(&self, raw: &str, encoded: &str) -> bool {
        self.encode(raw).eq_ignore_ascii_case(encoded)
    }
}

/// Turns a bearer token into an authentication.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// # Errors
    /// `AuthenticationError::InvalidToken` for unknown or expired tokens.
    async fn resolve(&self, token: &str) -> Result<Authentication, AuthenticationError>;
}

/// Fixed `token -> authentication` table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Authentication>,
}

impl StaticTokenResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, auth: Authentication) -> Self {
        self.tokens.insert(token.into(), auth);
        self
    }
}

#[async_trait]
impl TokenResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Result<Authentication, AuthenticationError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthenticationError::InvalidToken("unknown token".to_owned()))
    }
}

/// Renders the response of a successful form login.
pub trait AuthenticationSuccessHandler: Send + Sync {
    fn on_success(&self, auth: &Authentication) -> Response;
}

/// Renders the response of a failed form login.
pub trait AuthenticationFailureHandler: Send + Sync {
    fn on_failure(&self, error: &AuthenticationError) -> Response;
}

/// Login result body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub success: bool,
    pub username: String,
    pub authorities: Vec<String>,
}

/// `200 {"success": true, "username": .., "authorities": [..]}`
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultAuthenticationSuccessHandler;

impl AuthenticationSuccessHandler for ResultAuthenticationSuccessHandler {
    fn on_success(&self, auth: &Authentication) -> Response {
        let body = LoginResult {
            success: true,
            username: auth.principal.clone(),
            authorities: auth.authorities.clone(),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// `401` Problem Details.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultAuthenticationFailureHandler;

impl AuthenticationFailureHandler for ResultAuthenticationFailureHandler {
    fn on_failure(&self, error: &AuthenticationError) -> Response {
        error.clone().into_response()
    }
}

/// Username/password check shared by form and basic login.
///
/// # Errors
/// `BadCredentials` for unknown users and wrong passwords, `Disabled` for
/// disabled accounts.
pub async fn authenticate(
    users: &dyn UserDetailsService,
    encoder: &dyn PasswordEncoder,
    username: &str,
    password: &str,
) -> Result<UserDetails, AuthenticationError> {
    let Some(user) = users.load_user(username).await? else {
        tracing::debug!(username, "unknown user");
        return Err(AuthenticationError::BadCredentials);
    };
    if !encoder.matches(password, &user.password) {
        tracing::debug!(username, "password mismatch");
        return Err(AuthenticationError::BadCredentials);
    }
    if !user.enabled {
        return Err(AuthenticationError::Disabled);
    }
    Ok(user)
}
