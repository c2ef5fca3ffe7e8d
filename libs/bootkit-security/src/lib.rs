#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! HTTP security for axum routers: a CORS layer scoped to a path mapping and
//! an ordered chain of authentication and authorization filters.
//!
//! Filters communicate through request extensions: authentication filters
//! insert an [`Authentication`], later filters and handlers read it.

pub mod authentication;
pub mod chain;
pub mod cookies;
pub mod cors;
pub mod error;
pub mod filters;
pub mod path;
pub mod properties;
pub mod remember_me;
pub mod session;

pub use authentication::{
    Authentication, AuthenticationFailureHandler, AuthenticationKind,
    AuthenticationSuccessHandler, InMemoryUserDetailsService, NoOpPasswordEncoder,
    PasswordEncoder, ResultAuthenticationFailureHandler, ResultAuthenticationSuccessHandler,
    Sha256PasswordEncoder, StaticTokenResolver, TokenResolver, UserDetails, UserDetailsService,
};
pub use chain::{FilterOrder, SecurityFilter, SecurityFilterChain};
pub use cors::build_cors_layer;
pub use error::{AuthenticationError, SecurityConfigError};
pub use path::PathPattern;
pub use properties::{
    AccessRule, CorsProperties, SecurityProperties, SessionCreationPolicy,
};
pub use remember_me::RememberMeServices;
pub use session::SessionRegistry;
