//! Loading property sources from configuration files.
//!
//! Locations are glob patterns (`config/application-*.yaml`); each matching
//! file is handed to every loader whose extension it ends with.

use std::path::Path;

use figment::Figment;
use figment::providers::{Format, Json, Toml, Yaml};
use serde_json::{Map, Value};

use crate::environment::PropertySource;
use crate::error::EnvError;

/// Parses one file format into a [`PropertySource`].
pub trait PropertySourceLoader: Send + Sync {
    /// Extensions including the leading dot, lowercase.
    fn file_extensions(&self) -> &'static [&'static str];

    /// # Errors
    /// Returns `EnvError::Load` if the file cannot be parsed.
    fn load(&self, name: &str, path: &Path) -> Result<PropertySource, EnvError>;
}

fn extract(name: &str, figment: &Figment) -> Result<PropertySource, EnvError> {
    let values: Map<String, Value> = figment.extract().map_err(|e| EnvError::Load {
        name: name.to_owned(),
        source: Box::new(e),
    })?;
    Ok(PropertySource::new(name, values))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct YamlPropertySourceLoader;

impl PropertySourceLoader for YamlPropertySourceLoader {
    fn file_extensions(&self) -> &'static [&'static str] {
        &[".yaml", ".yml"]
    }

    fn load(&self, name: &str, path: &Path) -> Result<PropertySource, EnvError> {
        extract(name, &Figment::from(Yaml::file(path)))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPropertySourceLoader;

impl PropertySourceLoader for JsonPropertySourceLoader {
    fn file_extensions(&self) -> &'static [&'static str] {
        &[".json"]
    }

    fn load(&self, name: &str, path: &Path) -> Result<PropertySource, EnvError> {
        extract(name, &Figment::from(Json::file(path)))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TomlPropertySourceLoader;

impl PropertySourceLoader for TomlPropertySourceLoader {
    fn file_extensions(&self) -> &'static [&'static str] {
        &[".toml"]
    }

    fn load(&self, name: &str, path: &Path) -> Result<PropertySource, EnvError> {
        extract(name, &Figment::from(Toml::file(path)))
    }
}

/// Registry of loaders keyed by file extension.
pub struct PropertySourceLoaders {
    loaders: Vec<Box<dyn PropertySourceLoader>>,
}

impl Default for PropertySourceLoaders {
    fn default() -> Self {
        Self {
            loaders: vec![
                Box::new(YamlPropertySourceLoader),
                Box::new(JsonPropertySourceLoader),
                Box::new(TomlPropertySourceLoader),
            ],
        }
    }
}

impl PropertySourceLoaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn PropertySourceLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Load every file matching the given locations, in location order.
    /// Files within one location are visited in path order.
    ///
    /// # Errors
    /// Fails on an invalid pattern, an unreadable path or a parse error.
    pub fn load<I, S>(&self, locations: I) -> Result<Vec<PropertySource>, EnvError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sources = Vec::new();
        for location in locations {
            self.load_location(location.as_ref(), &mut sources)?;
        }
        Ok(sources)
    }

    fn load_location(
        &self,
        location: &str,
        sources: &mut Vec<PropertySource>,
    ) -> Result<(), EnvError> {
        let paths = glob::glob(location).map_err(|source| EnvError::Pattern {
            location: location.to_owned(),
            source,
        })?;

        let mut matched = 0usize;
        for entry in paths {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                EnvError::Unreadable {
                    path,
                    source: e.into_error(),
                }
            })?;
            if !path.is_file() {
                continue;
            }
            matched += 1;
            self.load_file(&path, sources)?;
        }

        if matched == 0 {
            tracing::debug!(location, "no configuration files matched");
        }
        Ok(())
    }

    fn load_file(&self, path: &Path, sources: &mut Vec<PropertySource>) -> Result<(), EnvError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        for loader in &self.loaders {
            if loader
                .file_extensions()
                .iter()
                .any(|ext| file_name.ends_with(ext))
            {
                let name = format!("file [{}]", path.display());
                tracing::debug!(source = %name, "loading property source");
                sources.push(loader.load(&name, path)?);
            }
        }
        Ok(())
    }
}
