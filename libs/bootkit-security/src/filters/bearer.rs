use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::authentication::TokenResolver;
use crate::chain::SecurityFilter;
use crate::cookies;

/// Cookie carrying the bearer token for browser clients.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticates `Authorization: Bearer <token>` or the `token` cookie
/// through a [`TokenResolver`]. Requests without a token pass through.
pub struct BearerTokenFilter {
    resolver: Arc<dyn TokenResolver>,
}

impl BearerTokenFilter {
    #[must_use]
    pub fn new(resolver: Arc<dyn TokenResolver>) -> Self {
        Self { resolver }
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty());
    from_header.or_else(|| cookies::get(headers, TOKEN_COOKIE).filter(|t| !t.is_empty()))
}

#[async_trait]
impl SecurityFilter for BearerTokenFilter {
    fn name(&self) -> &'static str {
        "bearer-authentication"
    }

    async fn filter(&self, mut req: Request, next: Next) -> Response {
        let Some(token) = extract_token(req.headers()) else {
            return next.run(req).await;
        };
        match self.resolver.resolve(&token).await {
            Ok(auth) => {
                tracing::debug!(principal = %auth.principal, "bearer token accepted");
                req.extensions_mut().insert(auth);
                next.run(req).await
            }
            Err(err) => {
                tracing::debug!(error = %err, "bearer token rejected");
                err.into_response()
            }
        }
    }
}
