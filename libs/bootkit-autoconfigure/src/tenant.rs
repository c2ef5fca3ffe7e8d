use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use bootkit_data::tenant::{TenantContext, TenantSupplier, TenantValue};
use bootkit_errors::{Problem, catalog};
use bootkit_security::Authentication;

/// Tenant of the authenticated principal, for passing into SQL rewriting.
///
/// Rejects with a 403 problem when the request has no principal or the
/// principal carries no tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTenant(pub TenantContext);

impl RequestTenant {
    #[must_use]
    pub fn from_authentication(auth: &Authentication) -> Option<Self> {
        auth.tenant
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| Self(TenantContext::new(t)))
    }

    #[must_use]
    pub fn context(&self) -> &TenantContext {
        &self.0
    }
}

impl TenantSupplier for RequestTenant {
    fn current_tenant(&self) -> Option<TenantValue> {
        self.0.current_tenant()
    }
}

impl<S> FromRequestParts<S> for RequestTenant
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Authentication>()
            .and_then(Self::from_authentication)
            .ok_or_else(|| {
                catalog::MISSING_TENANT.as_problem("the authenticated principal has no tenant")
            })
    }
}
