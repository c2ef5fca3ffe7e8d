use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::authentication::UserDetailsService;
use crate::chain::SecurityFilter;
use crate::cookies;
use crate::filters::current_authentication;
use crate::remember_me::RememberMeServices;

/// Logs unauthenticated requests in from a valid remember-me cookie and
/// clears cookies that fail verification.
pub struct RememberMeAuthenticationFilter {
    services: Arc<RememberMeServices>,
    users: Arc<dyn UserDetailsService>,
}

impl RememberMeAuthenticationFilter {
    #[must_use]
    pub fn new(services: Arc<RememberMeServices>, users: Arc<dyn UserDetailsService>) -> Self {
        Self { services, users }
    }
}

#[async_trait]
impl SecurityFilter for RememberMeAuthenticationFilter {
    fn name(&self) -> &'static str {
        "remember-me-authentication"
    }

    async fn filter(&self, mut req: Request, next: Next) -> Response {
        if current_authentication(&req).is_some() {
            return next.run(req).await;
        }
        let Some(cookie) = cookies::get(req.headers(), self.services.cookie_name()) else {
            return next.run(req).await;
        };

        if let Some(auth) = self.services.auto_login(&cookie, self.users.as_ref()).await {
            tracing::debug!(principal = %auth.principal, "remember-me login");
            req.extensions_mut().insert(auth);
            return next.run(req).await;
        }
        let mut resp = next.run(req).await;
        cookies::append(
            resp.headers_mut(),
            cookies::clear(self.services.cookie_name()),
        );
        resp
    }
}
