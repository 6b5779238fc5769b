//! Flat key→value configuration sources and their layering.

use std::collections::BTreeMap;
use std::fs;

use serde_yaml::Value;
use soaptap_core::error::{Result, TapError};

/// One layer of configuration.
pub trait ConfigSource: Send + Sync {
    /// Human-readable layer name (for startup logging).
    fn name(&self) -> &str;
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Process environment. Keys are looked up verbatim unless a prefix is set.
#[derive(Debug, Default, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}{key}", self.prefix)).ok()
    }
}

/// In-memory map, usually loaded from a flat YAML document.
#[derive(Debug, Default, Clone)]
pub struct StaticSource {
    name: String,
    values: BTreeMap<String, String>,
}

impl StaticSource {
    pub fn from_pairs<I, K, V>(name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let s = fs::read_to_string(path)
            .map_err(|e| TapError::Config(format!("read config failed ({path}): {e}")))?;
        Self::from_yaml_str(path, &s)
    }

    /// Parse a flat mapping of scalars. Nested mappings and sequences are
    /// rejected; `null` values are treated as absent.
    pub fn from_yaml_str(name: impl Into<String>, s: &str) -> Result<Self> {
        let raw: BTreeMap<String, Value> =
            serde_yaml::from_str(s).map_err(|e| TapError::Config(format!("invalid yaml: {e}")))?;

        let mut values = BTreeMap::new();
        for (key, value) in raw {
            let value = match value {
                Value::Null => continue,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => {
                    return Err(TapError::Config(format!("{key} must be a scalar value")));
                }
            };
            values.insert(key, value);
        }

        Ok(Self {
            name: name.into(),
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Ordered stack of sources; the first layer holding a key wins.
#[derive(Default)]
pub struct LayeredConfig {
    layers: Vec<Box<dyn ConfigSource>>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority layer.
    pub fn with_layer(mut self, source: impl ConfigSource + 'static) -> Self {
        self.layers.push(Box::new(source));
        self
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|l| l.lookup(key))
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.lookup(key).unwrap_or_else(|| default.to_string())
    }

    /// `true`/`false` (case-insensitive); anything else yields `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }

    /// Base-10 integer; anything else yields `default`.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.lookup(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}
