use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::authentication::Authentication;
use crate::chain::SecurityFilter;
use crate::filters::current_authentication;

/// Gives still-unauthenticated requests the anonymous principal.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousAuthenticationFilter;

#[async_trait]
impl SecurityFilter for AnonymousAuthenticationFilter {
    fn name(&self) -> &'static str {
        "anonymous-authentication"
    }

    async fn filter(&self, mut req: Request, next: Next) -> Response {
        if current_authentication(&req).is_none() {
            req.extensions_mut().insert(Authentication::anonymous());
        }
        next.run(req).await
    }
}
