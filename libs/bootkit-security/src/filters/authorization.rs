use async_trait::async_trait;
use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bootkit_errors::{Problem, catalog, finalize};

use crate::chain::SecurityFilter;
use crate::error::SecurityConfigError;
use crate::filters::current_authentication;
use crate::path::PathPattern;
use crate::properties::AccessRule;

const REQUEST_ID: &str = "x-request-id";

/// Problem response carrying the request path and, when present, the
/// caller's request id.
fn reject(req: &Request, problem: Problem) -> Response {
    let trace_id = req
        .headers()
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    finalize(problem, req.uri().path(), trace_id).into_response()
}

/// An [`AccessRule`] with its pattern parsed.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pattern: PathPattern,
    authorities: Vec<String>,
}

impl CompiledRule {
    /// # Errors
    /// `InvalidPattern` for malformed patterns.
    pub fn new(rule: &AccessRule) -> Result<Self, SecurityConfigError> {
        Ok(Self {
            pattern: PathPattern::new(&rule.pattern)?,
            authorities: rule.authorities.clone(),
        })
    }
}

/// First matching rule wins; unmatched paths and `OPTIONS` requests are
/// permitted.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationFilter {
    rules: Vec<CompiledRule>,
}

impl AuthorizationFilter {
    /// # Errors
    /// `InvalidPattern` when any rule pattern is malformed.
    pub fn new(rules: &[AccessRule]) -> Result<Self, SecurityConfigError> {
        Ok(Self {
            rules: rules
                .iter()
                .map(CompiledRule::new)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Rejection response, if the request may not proceed.
    fn deny(&self, req: &Request) -> Option<Response> {
        if req.method() == Method::OPTIONS {
            return None;
        }
        let path = req.uri().path();
        let rule = self.rules.iter().find(|r| r.pattern.matches(path))?;

        let auth = match current_authentication(req) {
            Some(auth) if !auth.is_anonymous() => auth,
            _ => {
                return Some(reject(
                    req,
                    catalog::UNAUTHENTICATED.as_problem(format!("authentication required for {path}")),
                ));
            }
        };
        if rule.authorities.is_empty() || auth.has_any_authority(&rule.authorities) {
            None
        } else {
            tracing::info!(
                principal = %auth.principal,
                pattern = rule.pattern.as_str(),
                "access denied"
            );
            Some(reject(
                req,
                catalog::ACCESS_DENIED
                    .as_problem(format!("'{}' may not access {path}", auth.principal)),
            ))
        }
    }
}

#[async_trait]
impl SecurityFilter for AuthorizationFilter {
    fn name(&self) -> &'static str {
        "authorization"
    }

    async fn filter(&self, req: Request, next: Next) -> Response {
        match self.deny(&req) {
            Some(resp) => resp,
            None => next.run(req).await,
        }
    }
}
