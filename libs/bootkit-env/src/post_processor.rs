use serde_json::Value;

use crate::environment::{Environment, PropertySource};
use crate::error::EnvError;

/// Hook that adjusts the environment before any properties are bound.
pub trait EnvironmentPostProcessor: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// Implementations return an error when the environment cannot be adjusted.
    fn post_process(&self, env: &mut Environment) -> Result<(), EnvError>;
}

/// Run processors in the given order.
///
/// # Errors
/// Stops at the first processor that fails.
pub fn apply_post_processors(
    env: &mut Environment,
    processors: &[&dyn EnvironmentPostProcessor],
) -> Result<(), EnvError> {
    for processor in processors {
        tracing::debug!(processor = processor.name(), "applying environment post-processor");
        processor.post_process(env)?;
    }
    Ok(())
}

/// Contributes default values for keys nobody else configured.
///
/// The defaults land in one lowest-precedence source; keys that are already
/// present anywhere in the environment are left alone.
#[derive(Debug, Clone)]
pub struct DefaultPropertyValues {
    source_name: String,
    defaults: Vec<(String, Value)>,
}

impl DefaultPropertyValues {
    #[must_use]
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            defaults: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.push((key.into(), value.into()));
        self
    }
}

impl EnvironmentPostProcessor for DefaultPropertyValues {
    fn name(&self) -> &str {
        &self.source_name
    }

    fn post_process(&self, env: &mut Environment) -> Result<(), EnvError> {
        let missing: Vec<(&str, Value)> = self
            .defaults
            .iter()
            .filter(|(key, _)| !env.contains_property(key))
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        for (key, value) in &missing {
            tracing::info!("{key}={value}");
        }
        env.add_last(PropertySource::from_flat(&self.source_name, missing));
        Ok(())
    }
}

/// `server.port = 8080` unless configured.
#[must_use]
pub fn server_defaults() -> DefaultPropertyValues {
    DefaultPropertyValues::new("defaultServerProperties").with("server.port", 8080)
}

/// Console logging defaults mirroring the stock line layout: timestamp,
/// level, thread, target, span context, message.
#[must_use]
pub fn logging_defaults() -> DefaultPropertyValues {
    DefaultPropertyValues::new("defaultLoggingProperties")
        .with("logging.level", "info")
        .with("logging.console.format", "text")
        .with("logging.console.with_target", true)
        .with("logging.console.with_thread_names", true)
}
