//! Configuration surface
//!
//! A named map of target configs, deserialized from JSON, turned into live
//! targets through a registry of builders keyed by the `type` and `format`
//! strings. Invalid entries surface as configuration errors before any
//! target is partially wired.

use super::engine::{Logfan, DEFAULT_MAX_QUEUE_SIZE};
use super::error::{EngineError, Result};
use super::filter::{CustomFilter, Filter, StdFilter};
use super::formatter::Formatter;
use super::level;
use super::target::Target;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

fn default_queue_size() -> usize {
    DEFAULT_MAX_QUEUE_SIZE
}

/// Configuration for one named target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Target builder key, e.g. `"console"`, `"file"`, `"tcp"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Formatter builder key, e.g. `"plain"`, `"json"`.
    pub format: String,

    /// Discrete set of enabled level names; builds a [`CustomFilter`].
    /// Mutually exclusive with `min_level`.
    #[serde(default)]
    pub levels: Vec<String>,

    /// Severity threshold name; builds a [`StdFilter`]. When neither this
    /// nor `levels` is set, the filter defaults to `info` and above.
    #[serde(default)]
    pub min_level: Option<String>,

    /// Options forwarded verbatim to the target and formatter builders.
    #[serde(default)]
    pub options: serde_json::Value,

    #[serde(default = "default_queue_size")]
    pub max_queue_size: usize,
}

/// Named map of target configs, the shape consumed from a JSON blob.
pub type TargetsConfig = HashMap<String, TargetConfig>;

type TargetBuilder = Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn Target>> + Send + Sync>;
type FormatterBuilder = Box<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Formatter>> + Send + Sync>;

/// Registry of target and formatter builders keyed by type string.
pub struct TargetFactory {
    targets: HashMap<String, TargetBuilder>,
    formatters: HashMap<String, FormatterBuilder>,
}

impl TargetFactory {
    /// An empty registry; register builders explicitly.
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
            formatters: HashMap::new(),
        }
    }

    /// A registry with the built-in targets (`console`, `file`, `tcp`) and
    /// formatters (`plain`, `json`).
    pub fn with_defaults() -> Self {
        use crate::formatters::{Json, Plain};
        use crate::targets::{ConsoleStream, ConsoleTarget, FileTarget, TcpTarget};

        #[derive(Deserialize, Default)]
        struct ConsoleOptions {
            #[serde(default)]
            stream: ConsoleStream,
        }

        #[derive(Deserialize)]
        struct FileOptions {
            path: String,
        }

        #[derive(Deserialize)]
        struct TcpOptions {
            addr: String,
            max_reconnect_delay_ms: Option<u64>,
        }

        #[derive(Deserialize, Default)]
        struct FormatOptions {
            #[serde(default)]
            color: bool,
            #[serde(default)]
            stacktrace: bool,
        }

        fn parse<T: for<'de> Deserialize<'de> + Default>(
            component: &str,
            options: &serde_json::Value,
        ) -> Result<T> {
            if options.is_null() {
                return Ok(T::default());
            }
            serde_json::from_value(options.clone())
                .map_err(|e| EngineError::config(component, e.to_string()))
        }

        let mut factory = Self::new();
        factory.register_target("console", |options| {
            let opts: ConsoleOptions = parse("console", options)?;
            Ok(Box::new(ConsoleTarget::new(opts.stream)))
        });
        factory.register_target("file", |options| {
            let opts: FileOptions = serde_json::from_value(options.clone())
                .map_err(|e| EngineError::config("file", e.to_string()))?;
            Ok(Box::new(FileTarget::new(opts.path)))
        });
        factory.register_target("tcp", |options| {
            let opts: TcpOptions = serde_json::from_value(options.clone())
                .map_err(|e| EngineError::config("tcp", e.to_string()))?;
            let mut target = TcpTarget::new(opts.addr);
            if let Some(ms) = opts.max_reconnect_delay_ms {
                target = target.with_max_reconnect_delay(std::time::Duration::from_millis(ms));
            }
            Ok(Box::new(target))
        });
        factory.register_formatter("plain", |options| {
            let opts: FormatOptions = parse("plain", options)?;
            Ok(Arc::new(
                Plain::new()
                    .with_color(opts.color)
                    .with_stacktrace(opts.stacktrace),
            ))
        });
        factory.register_formatter("json", |options| {
            let opts: FormatOptions = parse("json", options)?;
            Ok(Arc::new(Json::new().with_stacktrace(opts.stacktrace)))
        });
        factory
    }

    pub fn register_target(
        &mut self,
        kind: impl Into<String>,
        builder: impl Fn(&serde_json::Value) -> Result<Box<dyn Target>> + Send + Sync + 'static,
    ) {
        self.targets.insert(kind.into(), Box::new(builder));
    }

    pub fn register_formatter(
        &mut self,
        kind: impl Into<String>,
        builder: impl Fn(&serde_json::Value) -> Result<Arc<dyn Formatter>> + Send + Sync + 'static,
    ) {
        self.formatters.insert(kind.into(), Box::new(builder));
    }

    pub fn build_target(
        &self,
        kind: &str,
        options: &serde_json::Value,
    ) -> Result<Box<dyn Target>> {
        let builder = self
            .targets
            .get(kind)
            .ok_or_else(|| EngineError::config(kind, "unknown target type"))?;
        builder(options)
    }

    pub fn build_formatter(
        &self,
        kind: &str,
        options: &serde_json::Value,
    ) -> Result<Arc<dyn Formatter>> {
        let builder = self
            .formatters
            .get(kind)
            .ok_or_else(|| EngineError::config(kind, "unknown formatter type"))?;
        builder(options)
    }
}

impl Default for TargetFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn filter_from_config(name: &str, cfg: &TargetConfig) -> Result<Arc<dyn Filter>> {
    match (&cfg.min_level, cfg.levels.is_empty()) {
        (Some(_), false) => Err(EngineError::config(
            name,
            "set either min_level or levels, not both",
        )),
        (Some(min), true) => {
            let threshold = level::by_name(min)
                .ok_or_else(|| EngineError::config(name, format!("unknown level '{}'", min)))?;
            Ok(Arc::new(StdFilter::new(threshold)))
        }
        (None, false) => {
            let mut levels = Vec::with_capacity(cfg.levels.len());
            for entry in &cfg.levels {
                let lvl = level::by_name(entry).ok_or_else(|| {
                    EngineError::config(name, format!("unknown level '{}'", entry))
                })?;
                levels.push(lvl);
            }
            Ok(Arc::new(CustomFilter::new(levels)))
        }
        (None, true) => Ok(Arc::new(StdFilter::new(level::INFO))),
    }
}

/// Build every configured target and add it to the engine. Configuration
/// errors surface synchronously; nothing is added for an invalid entry.
pub fn apply(engine: &Logfan, config: &TargetsConfig, factory: &TargetFactory) -> Result<()> {
    for (name, cfg) in config {
        let filter = filter_from_config(name, cfg)?;
        let formatter = factory.build_formatter(&cfg.format, &cfg.options)?;
        let target = factory.build_target(&cfg.kind, &cfg.options)?;
        engine.add_target(target, name.as_str(), filter, formatter, cfg.max_queue_size)?;
    }
    Ok(())
}
