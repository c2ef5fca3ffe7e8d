//! SQL rewriting for multi-tenant data access.
//!
//! Outgoing statements pass through a [`SqlInterceptor`]: the SQL is parsed
//! with `sqlparser`, handed to an ordered list of [`InnerInterceptor`]s and
//! rendered back. The [`tenant::TenantLineInterceptor`] appends
//! `tenant = <current tenant>` to every SELECT, UPDATE and DELETE touching a
//! tenant-scoped table and fills the tenant column of every INSERT.
//!
//! ```rust
//! use std::sync::Arc;
//! use bootkit_data::{InterceptContext, SqlDialect, SqlInterceptor};
//! use bootkit_data::tenant::{
//!     DefaultTenantLineHandler, TenantContext, TenantLineInterceptor, TenantTableRegistry,
//! };
//!
//! let registry = TenantTableRegistry::new()
//!     .with_table("orders", true)
//!     .with_table("lookup_codes", false);
//! let handler = DefaultTenantLineHandler::new("tenant", Arc::new(registry));
//! let sql = SqlInterceptor::new(SqlDialect::Generic)
//!     .with(Arc::new(TenantLineInterceptor::new(Arc::new(handler))));
//!
//! let tenant = TenantContext::new("t1");
//! let ctx = InterceptContext::with_tenant(&tenant);
//! assert_eq!(
//!     sql.rewrite("SELECT * FROM orders", &ctx).unwrap(),
//!     "SELECT * FROM orders WHERE tenant = 't1'"
//! );
//! assert_eq!(
//!     sql.rewrite("SELECT * FROM lookup_codes", &ctx).unwrap(),
//!     "SELECT * FROM lookup_codes"
//! );
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod block_attack;
mod error;
mod interceptor;
pub mod tenant;

pub use block_attack::BlockAttackInterceptor;
pub use error::{InterceptError, TenantError};
pub use interceptor::{InnerInterceptor, InterceptContext, SqlDialect, SqlInterceptor, StatementKind};
