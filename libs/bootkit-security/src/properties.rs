use serde::{Deserialize, Serialize};

/// Bound from the `cors` prefix. Options left unset are not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsProperties {
    /// Path pattern the CORS configuration applies to.
    pub mapping: String,
    pub allowed_headers: Option<Vec<String>>,
    pub allowed_methods: Option<Vec<String>>,
    pub allowed_origins: Option<Vec<String>>,
    pub allow_credentials: Option<bool>,
    /// Preflight cache duration in seconds.
    pub max_age: Option<u64>,
}

impl Default for CorsProperties {
    fn default() -> Self {
        Self {
            mapping: "/**".to_owned(),
            allowed_headers: None,
            allowed_methods: None,
            allowed_origins: None,
            allow_credentials: None,
            max_age: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicProperties {
    pub enable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RememberMeProperties {
    pub enable: bool,
    pub always_remember: bool,
    /// Signing key; required when enabled.
    pub key: Option<String>,
    pub validity_seconds: u64,
    /// Login request field that asks for a remember-me cookie.
    pub parameter: String,
    pub cookie_name: String,
}

impl Default for RememberMeProperties {
    fn default() -> Self {
        Self {
            enable: false,
            always_remember: false,
            key: None,
            validity_seconds: 14 * 24 * 60 * 60,
            parameter: "remember-me".to_owned(),
            cookie_name: "remember-me".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymousProperties {
    pub enable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoutProperties {
    pub url: String,
}

impl Default for LogoutProperties {
    fn default() -> Self {
        Self {
            url: "/api/logout".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginProperties {
    pub url: String,
}

impl Default for LoginProperties {
    fn default() -> Self {
        Self {
            url: "/api/login".to_owned(),
        }
    }
}

/// When the chain creates or reuses server-side sessions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCreationPolicy {
    /// Create a session for every request.
    Always,
    /// Create a session once a request authenticates.
    IfRequired,
    /// Reuse existing sessions, never create one.
    Never,
    /// No sessions at all.
    #[default]
    Stateless,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionProperties {
    pub policy: SessionCreationPolicy,
}

/// Requests whose path matches `pattern` need an authenticated principal,
/// holding one of `authorities` when the list is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub pattern: String,
    #[serde(default)]
    pub authorities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessProperties {
    pub rules: Vec<AccessRule>,
}

/// Bound from the `security` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityProperties {
    pub basic: BasicProperties,
    pub remember_me: RememberMeProperties,
    pub anonymous: AnonymousProperties,
    pub logout: LogoutProperties,
    pub login: LoginProperties,
    pub session: SessionProperties,
    pub access: AccessProperties,
}
