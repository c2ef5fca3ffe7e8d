use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::chain::SecurityFilter;
use crate::cookies;
use crate::filters::TOKEN_COOKIE;
use crate::session::{SESSION_COOKIE, SessionId, SessionRegistry};

/// Answers requests to the logout URL, with any method, by clearing the
/// token and remember-me cookies and invalidating the session.
pub struct LogoutFilter {
    url: String,
    remember_me_cookie: Option<String>,
    sessions: Option<Arc<SessionRegistry>>,
}

impl LogoutFilter {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            remember_me_cookie: None,
            sessions: None,
        }
    }

    #[must_use]
    pub fn with_remember_me_cookie(mut self, name: impl Into<String>) -> Self {
        self.remember_me_cookie = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = Some(sessions);
        self
    }
}

#[async_trait]
impl SecurityFilter for LogoutFilter {
    fn name(&self) -> &'static str {
        "logout"
    }

    async fn filter(&self, req: Request, next: Next) -> Response {
        if req.uri().path() != self.url {
            return next.run(req).await;
        }

        if let (Some(sessions), Some(SessionId(id))) =
            (&self.sessions, req.extensions().get::<SessionId>())
        {
            sessions.invalidate(id);
        }

        let mut resp = (StatusCode::OK, Json(json!({ "success": true }))).into_response();
        let headers = resp.headers_mut();
        cookies::append(headers, cookies::clear(TOKEN_COOKIE));
        if let Some(name) = &self.remember_me_cookie {
            cookies::append(headers, cookies::clear(name));
        }
        if self.sessions.is_some() {
            cookies::append(headers, cookies::clear(SESSION_COOKIE));
        }
        tracing::debug!(path = %self.url, "logged out");
        resp
    }
}
