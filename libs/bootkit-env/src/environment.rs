use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::EnvError;

/// A named set of (possibly nested) properties.
///
/// Keys are addressed with dotted paths: `server.port` resolves
/// `{"server": {"port": ...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySource {
    name: String,
    values: Map<String, Value>,
}

impl PropertySource {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a source from flat dotted keys, nesting them on the way in.
    #[must_use]
    pub fn from_flat<I, K>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut values = Map::new();
        for (key, value) in entries {
            insert_path(&mut values, key.as_ref(), value);
        }
        Self::new(name, values)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.values.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

fn insert_path(target: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            target.insert(key.to_owned(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Ordered property sources, highest precedence first.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    sources: Vec<PropertySource>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment seeded with process environment variables.
    ///
    /// `{PREFIX}__SERVER__PORT=9090` becomes `server.port = 9090`.
    ///
    /// # Errors
    /// Returns `EnvError::EnvVars` if the variables cannot be collected.
    pub fn standard(prefix: &str) -> Result<Self, EnvError> {
        let mut env = Self::new();
        env.add_last(Self::env_source(prefix)?);
        Ok(env)
    }

    fn env_source(prefix: &str) -> Result<PropertySource, EnvError> {
        let provider = Env::prefixed(&format!("{prefix}__")).split("__");
        let values: Map<String, Value> = Figment::from(provider)
            .extract()
            .map_err(|e| EnvError::EnvVars(Box::new(e)))?;
        Ok(PropertySource::new("systemEnvironment", values))
    }

    /// Insert with the highest precedence.
    pub fn add_first(&mut self, source: PropertySource) {
        self.sources.insert(0, source);
    }

    /// Insert with the lowest precedence.
    pub fn add_last(&mut self, source: PropertySource) {
        self.sources.push(source);
    }

    /// Insert directly above the named source, or last if it is absent.
    pub fn add_before(&mut self, relative_to: &str, source: PropertySource) {
        match self.sources.iter().position(|s| s.name == relative_to) {
            Some(idx) => self.sources.insert(idx, source),
            None => self.sources.push(source),
        }
    }

    #[must_use]
    pub fn sources(&self) -> &[PropertySource] {
        &self.sources
    }

    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(PropertySource::name).collect()
    }

    #[must_use]
    pub fn contains_property(&self, key: &str) -> bool {
        self.sources.iter().any(|s| s.contains(key))
    }

    /// Raw value from the highest-precedence source defining `key`.
    #[must_use]
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.sources.iter().find_map(|s| s.lookup(key))
    }

    /// Typed lookup of a single property.
    ///
    /// # Errors
    /// Returns `EnvError::InvalidProperty` if the value has the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, EnvError> {
        let Some(raw) = self.get_property(key) else {
            return Ok(None);
        };
        serde_json::from_value(raw.clone())
            .map(Some)
            .map_err(|source| EnvError::InvalidProperty {
                key: key.to_owned(),
                source,
            })
    }

    /// Scalar property rendered as text (`8080` -> `"8080"`).
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get_property(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// All sources merged into one figment, lowest precedence first.
    #[must_use]
    pub fn figment(&self) -> Figment {
        self.sources
            .iter()
            .rev()
            .fold(Figment::new(), |fig, source| {
                fig.merge(Serialized::defaults(&source.values))
            })
    }

    /// Bind the subtree under `prefix`, falling back to `T::default()` when
    /// nothing is configured there.
    ///
    /// # Errors
    /// Returns `EnvError::Bind` if the subtree exists but cannot be deserialized.
    pub fn bind<T: DeserializeOwned + Default>(&self, prefix: &str) -> Result<T, EnvError> {
        if !self.contains_property(prefix) {
            return Ok(T::default());
        }
        self.bind_required(prefix)
    }

    /// Bind the subtree under `prefix`; missing configuration is an error.
    ///
    /// # Errors
    /// Returns `EnvError::Bind` if the subtree is missing or invalid.
    pub fn bind_required<T: DeserializeOwned>(&self, prefix: &str) -> Result<T, EnvError> {
        self.figment()
            .extract_inner(prefix)
            .map_err(|e| EnvError::Bind {
                prefix: prefix.to_owned(),
                source: Box::new(e),
            })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn source(name: &str, value: Value) -> PropertySource {
        let Value::Object(map) = value else {
            panic!("test sources must be objects");
        };
        PropertySource::new(name, map)
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct ServerProps {
        port: u16,
        host: String,
    }

    #[test]
    fn from_flat_nests_dotted_keys() {
        let src = PropertySource::from_flat(
            "flat",
            [("server.port", json!(8080)), ("server.host", json!("0.0.0.0"))],
        );
        assert_eq!(src.values()["server"]["port"], 8080);
        assert!(src.contains("server.host"));
        assert!(!src.contains("server.path"));
    }

    #[test]
    fn lookup_prefers_highest_precedence() {
        let mut env = Environment::new();
        env.add_last(source("low", json!({"server": {"port": 8080}})));
        env.add_first(source("high", json!({"server": {"port": 9090}})));

        assert_eq!(env.get::<u16>("server.port").unwrap(), Some(9090));
        assert_eq!(env.source_names(), vec!["high", "low"]);
    }

    #[test]
    fn bind_merges_sources_key_by_key() {
        let mut env = Environment::new();
        env.add_last(source("defaults", json!({"server": {"port": 8080, "host": "127.0.0.1"}})));
        env.add_first(source("file", json!({"server": {"host": "0.0.0.0"}})));

        let props: ServerProps = env.bind("server").unwrap();
        assert_eq!(
            props,
            ServerProps {
                port: 8080,
                host: "0.0.0.0".to_owned()
            }
        );
    }

    #[test]
    fn bind_missing_prefix_yields_default() {
        let env = Environment::new();
        let props: ServerProps = env.bind("server").unwrap();
        assert_eq!(props, ServerProps::default());
        assert!(env.bind_required::<ServerProps>("server").is_err());
    }

    #[test]
    fn get_reports_type_mismatch() {
        let mut env = Environment::new();
        env.add_last(source("s", json!({"server": {"port": "not-a-port"}})));
        let err = env.get::<u16>("server.port").unwrap_err();
        assert!(matches!(err, EnvError::InvalidProperty { ref key, .. } if key == "server.port"));
    }

    #[test]
    fn get_string_renders_scalars_only() {
        let mut env = Environment::new();
        env.add_last(source("s", json!({"a": 1, "b": true, "c": "x", "d": {"e": 1}})));
        assert_eq!(env.get_string("a").as_deref(), Some("1"));
        assert_eq!(env.get_string("b").as_deref(), Some("true"));
        assert_eq!(env.get_string("c").as_deref(), Some("x"));
        assert_eq!(env.get_string("d"), None);
    }

    #[test]
    fn add_before_places_source_above_anchor() {
        let mut env = Environment::new();
        env.add_last(source("a", json!({})));
        env.add_last(source("c", json!({})));
        env.add_before("c", source("b", json!({})));
        env.add_before("missing", source("d", json!({})));
        assert_eq!(env.source_names(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn standard_reads_prefixed_variables() {
        temp_env::with_vars(
            [
                ("BOOTKITTEST__SERVER__PORT", Some("9191")),
                ("BOOTKITTEST__DATA__TENANT__COLUMN", Some("org_id")),
            ],
            || {
                let env = Environment::standard("BOOTKITTEST").unwrap();
                assert_eq!(env.get::<u16>("server.port").unwrap(), Some(9191));
                assert_eq!(
                    env.get_string("data.tenant.column").as_deref(),
                    Some("org_id")
                );
            },
        );
    }
}
