use axum::response::{IntoResponse, Response};
use bootkit_errors::catalog;

/// Invalid security configuration, detected while assembling the chain.
#[derive(thiserror::Error, Debug)]
pub enum SecurityConfigError {
    #[error(
        "CORS misconfiguration: allowed_origins=['*'] cannot be combined with allow_credentials=true"
    )]
    WildcardOriginWithCredentials,

    #[error("invalid CORS {kind} '{value}'")]
    InvalidCorsValue { kind: &'static str, value: String },

    #[error("invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("remember-me is enabled but no security.remember_me.key is configured")]
    MissingRememberMeKey,

    #[error("{feature} requires a user details service")]
    MissingUserDetailsService { feature: &'static str },
}

/// Why a request could not be authenticated.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("bad credentials")]
    BadCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("user account is disabled")]
    Disabled,

    #[error("malformed login request: {0}")]
    MalformedRequest(String),

    #[error("authentication backend failed: {0}")]
    Internal(String),
}

impl AuthenticationError {
    pub fn to_problem(&self) -> bootkit_errors::Problem {
        let def = match self {
            Self::Unauthenticated => catalog::UNAUTHENTICATED,
            Self::BadCredentials | Self::Disabled | Self::MalformedRequest(_) => {
                catalog::BAD_CREDENTIALS
            }
            Self::InvalidToken(_) => catalog::INVALID_TOKEN,
            Self::Internal(_) => catalog::INTERNAL,
        };
        def.as_problem(self.to_string())
    }
}

impl IntoResponse for AuthenticationError {
    fn into_response(self) -> Response {
        self.to_problem().into_response()
    }
}
