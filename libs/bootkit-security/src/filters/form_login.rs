use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use crate::authentication::{
    Authentication, AuthenticationFailureHandler, AuthenticationKind,
    AuthenticationSuccessHandler, PasswordEncoder, UserDetailsService, authenticate,
};
use crate::chain::SecurityFilter;
use crate::cookies;
use crate::error::AuthenticationError;
use crate::remember_me::RememberMeServices;
use crate::session::SaveContext;

const MAX_LOGIN_BODY: usize = 64 * 1024;

#[derive(Debug, PartialEq, Eq)]
struct LoginForm {
    username: String,
    password: String,
    remember: Option<String>,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json") || ct.contains("+json"))
}

fn parse_form(
    headers: &HeaderMap,
    body: &[u8],
    remember_parameter: &str,
) -> Result<LoginForm, AuthenticationError> {
    let mut fields: HashMap<String, String> = if is_json(headers) {
        let map: serde_json::Map<String, Value> = serde_json::from_slice(body)
            .map_err(|e| AuthenticationError::MalformedRequest(e.to_string()))?;
        map.into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                Value::Bool(b) => Some((k, b.to_string())),
                Value::Number(n) => Some((k, n.to_string())),
                _ => None,
            })
            .collect()
    } else {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| AuthenticationError::MalformedRequest(e.to_string()))?
    };

    let mut take = |name: &str| {
        fields
            .remove(name)
            .ok_or_else(|| AuthenticationError::MalformedRequest(format!("missing '{name}'")))
    };
    let username = take("username")?;
    let password = take("password")?;
    Ok(LoginForm {
        username,
        password,
        remember: fields.remove(remember_parameter),
    })
}

/// Answers `POST <login url>` with a form or JSON body carrying `username`
/// and `password`.
pub struct UsernamePasswordAuthenticationFilter {
    url: String,
    users: Arc<dyn UserDetailsService>,
    encoder: Arc<dyn PasswordEncoder>,
    success: Arc<dyn AuthenticationSuccessHandler>,
    failure: Arc<dyn AuthenticationFailureHandler>,
    remember_me: Option<Arc<RememberMeServices>>,
    save_session: bool,
}

impl UsernamePasswordAuthenticationFilter {
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        users: Arc<dyn UserDetailsService>,
        encoder: Arc<dyn PasswordEncoder>,
        success: Arc<dyn AuthenticationSuccessHandler>,
        failure: Arc<dyn AuthenticationFailureHandler>,
    ) -> Self {
        Self {
            url: url.into(),
            users,
            encoder,
            success,
            failure,
            remember_me: None,
            save_session: false,
        }
    }

    #[must_use]
    pub fn with_remember_me(mut self, services: Arc<RememberMeServices>) -> Self {
        self.remember_me = Some(services);
        self
    }

    /// Hand the new authentication to the persistence filter.
    #[must_use]
    pub fn with_session(mut self, save: bool) -> Self {
        self.save_session = save;
        self
    }

    async fn attempt(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();
        let bytes = match to_bytes(body, MAX_LOGIN_BODY).await {
            Ok(b) => b,
            Err(e) => {
                let err = AuthenticationError::MalformedRequest(e.to_string());
                return self.failure.on_failure(&err);
            }
        };
        let parameter = self
            .remember_me
            .as_ref()
            .map_or("remember-me", |rm| rm.parameter());
        let form = match parse_form(&parts.headers, &bytes, parameter) {
            Ok(f) => f,
            Err(err) => return self.failure.on_failure(&err),
        };

        let user = match authenticate(
            self.users.as_ref(),
            self.encoder.as_ref(),
            &form.username,
            &form.password,
        )
        .await
        {
            Ok(user) => user,
            Err(err) => {
                tracing::info!(username = %form.username, error = %err, "login failed");
                return self.failure.on_failure(&err);
            }
        };

        let auth = Authentication::from_user(&user, AuthenticationKind::Form);
        tracing::info!(username = %auth.principal, "login succeeded");
        let mut resp = self.success.on_success(&auth);

        if let Some(rm) = &self.remember_me
            && rm.requested(form.remember.as_deref())
        {
            let value = rm.encode_cookie(&user);
            cookies::append(
                resp.headers_mut(),
                cookies::set(rm.cookie_name(), &value, Some(rm.validity().as_secs())),
            );
        }
        if self.save_session {
            resp.extensions_mut().insert(SaveContext(Some(auth)));
        }
        resp
    }
}

#[async_trait]
impl SecurityFilter for UsernamePasswordAuthenticationFilter {
    fn name(&self) -> &'static str {
        "username-password-authentication"
    }

    async fn filter(&self, req: Request, next: Next) -> Response {
        if req.method() == Method::POST && req.uri().path() == self.url {
            self.attempt(req).await
        } else {
            next.run(req).await
        }
    }
}
