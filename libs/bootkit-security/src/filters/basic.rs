use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::authentication::{
    Authentication, AuthenticationKind, PasswordEncoder, UserDetailsService, authenticate,
};
use crate::chain::SecurityFilter;
use crate::error::AuthenticationError;

const CHALLENGE: &str = "Basic realm=\"Realm\"";

/// `Authorization: Basic` credentials checked against a
/// [`UserDetailsService`].
pub struct BasicAuthenticationFilter {
    users: Arc<dyn UserDetailsService>,
    encoder: Arc<dyn PasswordEncoder>,
}

impl BasicAuthenticationFilter {
    #[must_use]
    pub fn new(users: Arc<dyn UserDetailsService>, encoder: Arc<dyn PasswordEncoder>) -> Self {
        Self { users, encoder }
    }
}

/// `None` when the request carries no basic credentials at all.
fn credentials(headers: &HeaderMap) -> Option<Result<(String, String), AuthenticationError>> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());
    Some(
        decoded
            .and_then(|pair| {
                pair.split_once(':')
                    .map(|(u, p)| (u.to_owned(), p.to_owned()))
            })
            .ok_or_else(|| {
                AuthenticationError::MalformedRequest("invalid basic credentials".to_owned())
            }),
    )
}

fn challenge(err: AuthenticationError) -> Response {
    let mut resp = err.into_response();
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    resp
}

#[async_trait]
impl SecurityFilter for BasicAuthenticationFilter {
    fn name(&self) -> &'static str {
        "basic-authentication"
    }

    async fn filter(&self, mut req: Request, next: Next) -> Response {
        let (username, password) = match credentials(req.headers()) {
            None => return next.run(req).await,
            Some(Err(err)) => return challenge(err),
            Some(Ok(pair)) => pair,
        };
        match authenticate(
            self.users.as_ref(),
            self.encoder.as_ref(),
            &username,
            &password,
        )
        .await
        {
            Ok(user) => {
                req.extensions_mut()
                    .insert(Authentication::from_user(&user, AuthenticationKind::Basic));
                next.run(req).await
            }
            Err(err) => {
                tracing::debug!(username, error = %err, "basic authentication failed");
                challenge(err)
            }
        }
    }
}
