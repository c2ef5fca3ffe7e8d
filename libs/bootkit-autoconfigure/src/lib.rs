#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Startup assembly for bootkit applications.
//!
//! Properties are bound from a [`bootkit_env::Environment`] and each
//! component is constructed only when its configuration and collaborators
//! are present:
//!
//! | Component | Condition |
//! |-----------|-----------|
//! | tenant handler | `data.tenant.enable` and a table source |
//! | SQL pipeline | at least one interceptor |
//! | CORS layer | a `cors` section |
//! | validator | a [`ValidationGroupsProvider`] |

mod bootstrap;
pub mod data;
mod error;
pub mod security;
mod tenant;
pub mod validation;

pub use bootstrap::{Bootstrap, Components};
pub use error::BootstrapError;
pub use tenant::RequestTenant;
pub use validation::{
    GroupValidate, MethodValidationError, MethodValidationExcludeFilter, MethodValidator,
    StaticValidationGroups, ValidationGroupsProvider,
};
