//! Layered property environment for bootkit applications.
//!
//! An [`Environment`] is an ordered list of named [`PropertySource`]s. Lookups
//! walk the sources from highest to lowest precedence; typed binding merges
//! all sources through `figment` so that a higher source only overrides the
//! keys it actually defines.
//!
//! Sources come from three places:
//! - environment variables ([`Environment::standard`]),
//! - configuration files ([`PropertySourceLoaders`]),
//! - built-in defaults contributed by [`EnvironmentPostProcessor`]s.
//!
//! ```rust
//! use bootkit_env::{Environment, apply_post_processors, server_defaults};
//!
//! let mut env = Environment::new();
//! apply_post_processors(&mut env, &[&server_defaults()]).unwrap();
//! assert_eq!(env.get::<u16>("server.port").unwrap(), Some(8080));
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod environment;
mod error;
pub mod loaders;
pub mod logging;
mod post_processor;

pub use environment::{Environment, PropertySource};
pub use error::EnvError;
pub use loaders::{
    JsonPropertySourceLoader, PropertySourceLoader, PropertySourceLoaders,
    TomlPropertySourceLoader, YamlPropertySourceLoader,
};
pub use logging::{LogFormat, LoggingGuard, LoggingProperties, init_logging};
pub use post_processor::{
    DefaultPropertyValues, EnvironmentPostProcessor, apply_post_processors, logging_defaults,
    server_defaults,
};
