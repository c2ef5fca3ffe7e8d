use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::authentication::{Authentication, AuthenticationKind};
use crate::chain::SecurityFilter;
use crate::filters::current_authentication;
use crate::properties::SessionCreationPolicy;
use crate::session::{SaveContext, SessionId};

/// Decides, per the creation policy, whether the request's authentication
/// is handed to the persistence filter.
#[derive(Debug, Clone)]
pub struct SessionManagementFilter {
    policy: SessionCreationPolicy,
}

impl SessionManagementFilter {
    #[must_use]
    pub fn new(policy: SessionCreationPolicy) -> Self {
        Self { policy }
    }

    fn to_save(&self, auth: Option<&Authentication>, has_session: bool) -> Option<SaveContext> {
        let authenticated = auth
            .filter(|a| !a.is_anonymous() && a.kind != AuthenticationKind::Session)
            .cloned();
        match self.policy {
            SessionCreationPolicy::Stateless => None,
            SessionCreationPolicy::Always if !has_session => Some(SaveContext(authenticated)),
            SessionCreationPolicy::Always
            | SessionCreationPolicy::IfRequired
            | SessionCreationPolicy::Never => authenticated.map(|a| SaveContext(Some(a))),
        }
    }
}

#[async_trait]
impl SecurityFilter for SessionManagementFilter {
    fn name(&self) -> &'static str {
        "session-management"
    }

    async fn filter(&self, req: Request, next: Next) -> Response {
        let save = self.to_save(
            current_authentication(&req),
            req.extensions().get::<SessionId>().is_some(),
        );
        let mut resp = next.run(req).await;
        if let Some(save) = save
            && resp.extensions().get::<SaveContext>().is_none()
        {
            resp.extensions_mut().insert(save);
        }
        resp
    }
}
