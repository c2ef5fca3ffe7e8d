//! `tracing` subscriber bootstrap driven by `logging.*` properties.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::EnvError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleLogging {
    pub enabled: bool,
    pub format: LogFormat,
    pub with_target: bool,
    pub with_thread_names: bool,
    pub ansi: bool,
}

impl Default for ConsoleLogging {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Text,
            with_target: true,
            with_thread_names: true,
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogging {
    pub directory: PathBuf,
    pub file_name: String,
    pub format: LogFormat,
    pub rotation: Rotation,
}

impl Default for FileLogging {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "bootkit.log".to_owned(),
            format: LogFormat::Json,
            rotation: Rotation::Daily,
        }
    }
}

/// Bound from the `logging` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingProperties {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub console: ConsoleLogging,
    pub file: Option<FileLogging>,
}

impl Default for LoggingProperties {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            console: ConsoleLogging::default(),
            file: None,
        }
    }
}

/// Keeps the non-blocking file writer flushing; drop it on shutdown.
#[must_use]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn console_layer(cfg: &ConsoleLogging) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(cfg.with_target)
        .with_thread_names(cfg.with_thread_names);
    match cfg.format {
        LogFormat::Text => layer.with_ansi(cfg.ansi).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
    }
}

fn file_layer(cfg: &FileLogging) -> (BoxedLayer, WorkerGuard) {
    let appender = match cfg.rotation {
        Rotation::Daily => tracing_appender::rolling::daily(&cfg.directory, &cfg.file_name),
        Rotation::Hourly => tracing_appender::rolling::hourly(&cfg.directory, &cfg.file_name),
        Rotation::Never => tracing_appender::rolling::never(&cfg.directory, &cfg.file_name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);
    let boxed = match cfg.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
    };
    (boxed, guard)
}

fn build_filter(level: &str) -> Result<EnvFilter, EnvError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| EnvError::Logging(format!("invalid level '{level}': {e}")))
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `EnvError::Logging` for an invalid level directive or when a
/// global subscriber is already installed.
pub fn init_logging(props: &LoggingProperties) -> Result<LoggingGuard, EnvError> {
    let filter = build_filter(&props.level)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if props.console.enabled {
        layers.push(console_layer(&props.console));
    }
    let mut guard = None;
    if let Some(file_cfg) = &props.file {
        let (layer, g) = file_layer(file_cfg);
        layers.push(layer);
        guard = Some(g);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| EnvError::Logging(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}
