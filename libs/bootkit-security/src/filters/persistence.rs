use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::authentication::AuthenticationKind;
use crate::chain::SecurityFilter;
use crate::cookies;
use crate::properties::SessionCreationPolicy;
use crate::session::{SESSION_COOKIE, SaveContext, SessionId, SessionRegistry};

/// Restores the authentication stored in the request's session and saves the
/// one handed back through [`SaveContext`] once the response is produced.
pub struct SecurityContextPersistenceFilter {
    sessions: Arc<SessionRegistry>,
    policy: SessionCreationPolicy,
}

impl SecurityContextPersistenceFilter {
    #[must_use]
    pub fn new(sessions: Arc<SessionRegistry>, policy: SessionCreationPolicy) -> Self {
        Self { sessions, policy }
    }

    fn may_create(&self) -> bool {
        matches!(
            self.policy,
            SessionCreationPolicy::Always | SessionCreationPolicy::IfRequired
        )
    }
}

#[async_trait]
impl SecurityFilter for SecurityContextPersistenceFilter {
    fn name(&self) -> &'static str {
        "security-context-persistence"
    }

    async fn filter(&self, mut req: Request, next: Next) -> Response {
        let session = cookies::get(req.headers(), SESSION_COOKIE)
            .and_then(|id| self.sessions.get(&id).map(|auth| (id, auth)));

        let existing = match session {
            Some((id, auth)) => {
                if let Some(mut auth) = auth {
                    auth.kind = AuthenticationKind::Session;
                    req.extensions_mut().insert(auth);
                }
                req.extensions_mut().insert(SessionId(id.clone()));
                Some(id)
            }
            None => None,
        };

        let mut resp = next.run(req).await;

        let Some(SaveContext(auth)) = resp.extensions_mut().remove::<SaveContext>() else {
            return resp;
        };
        if let Some(id) = existing {
            // No-op when logout invalidated the session on the way in.
            self.sessions.store(&id, auth);
        } else if self.may_create() {
            let id = self.sessions.create(auth);
            cookies::append(resp.headers_mut(), cookies::set(SESSION_COOKIE, &id, None));
        }
        resp
    }
}
