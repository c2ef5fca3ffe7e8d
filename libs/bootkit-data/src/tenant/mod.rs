//! Tenant-line isolation.
//!
//! A [`TenantLineHandler`] decides per table whether the statement needs a
//! tenant predicate; the [`TenantLineInterceptor`] splices that predicate
//! into the statement AST.

mod context;
mod handler;
mod line;
mod registry;

pub use context::{FnTenantSupplier, TenantContext, TenantSupplier, TenantValue};
pub use handler::{DefaultTenantLineHandler, TenantLineHandler, TenantPredicate, TenantProperties};
pub use line::TenantLineInterceptor;
pub use registry::{TenantTableRegistry, TenantTableService};
