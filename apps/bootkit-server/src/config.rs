use std::net::{IpAddr, Ipv4Addr};

use bootkit_env::{
    Environment, PropertySource, PropertySourceLoaders, apply_post_processors, logging_defaults,
    server_defaults,
};
use bootkit_security::UserDetails;
use serde::{Deserialize, Serialize};

/// Prefix of environment variables, e.g. `BOOTKIT__SERVER__PORT`.
pub const ENV_PREFIX: &str = "BOOTKIT";

/// Bound from the `server` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerProperties {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}

/// Bound from the `database` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseProperties {
    pub url: String,
}

impl Default for DatabaseProperties {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_owned(),
        }
    }
}

/// Accounts served by the in-memory user store, from the `users` key.
///
/// # Errors
/// A `users` value that is not a list of accounts.
pub fn users(env: &Environment) -> Result<Vec<UserDetails>, bootkit_env::EnvError> {
    Ok(env.get("users")?.unwrap_or_default())
}

/// Environment variables, then config files (later locations win), then
/// the built-in defaults. A `port` given on the command line beats all.
///
/// # Errors
/// Unreadable or unparsable config files.
pub fn load_environment(
    locations: &[String],
    port: Option<u16>,
) -> Result<Environment, bootkit_env::EnvError> {
    let mut env = Environment::standard(ENV_PREFIX)?;
    let files = PropertySourceLoaders::new().load(locations)?;
    for source in files.into_iter().rev() {
        env.add_last(source);
    }
    if let Some(port) = port {
        env.add_first(PropertySource::from_flat(
            "commandLineArgs",
            [("server.port", serde_json::json!(port))],
        ));
    }
    apply_post_processors(&mut env, &[&server_defaults(), &logging_defaults()])?;
    Ok(env)
}
