//! Built-in filters, one per [`FilterOrder`](crate::FilterOrder) anchor.

mod anonymous;
mod authorization;
mod basic;
mod bearer;
mod form_login;
mod logout;
mod persistence;
mod remember_me;
mod session_management;

pub use anonymous::AnonymousAuthenticationFilter;
pub use authorization::{AuthorizationFilter, CompiledRule};
pub use basic::BasicAuthenticationFilter;
pub use bearer::{BearerTokenFilter, TOKEN_COOKIE};
pub use form_login::UsernamePasswordAuthenticationFilter;
pub use logout::LogoutFilter;
pub use persistence::SecurityContextPersistenceFilter;
pub use remember_me::RememberMeAuthenticationFilter;
pub use session_management::SessionManagementFilter;

use axum::extract::Request;

use crate::authentication::Authentication;

pub(crate) fn current_authentication(req: &Request) -> Option<&Authentication> {
    req.extensions().get::<Authentication>()
}
