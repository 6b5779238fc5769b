//! Interceptor configuration: layered key lookup and the resolved snapshot.

pub mod schema;
pub mod source;

use std::path::{Path, PathBuf};

use soaptap_core::error::Result;

pub use schema::{keys, Settings, SinkToggles};
pub use source::{ConfigSource, EnvSource, LayeredConfig, StaticSource};

/// Environment overrides first, then the YAML file at `path` if it exists.
pub fn load_from_file(path: &str) -> Result<LayeredConfig> {
    let layers = LayeredConfig::new().with_layer(EnvSource::new());
    if !Path::new(path).exists() {
        tracing::info!(%path, "config file not found; using environment and defaults");
        return Ok(layers);
    }
    Ok(layers.with_layer(StaticSource::from_yaml_file(path)?))
}

/// Same layering over an in-memory YAML document.
pub fn load_from_str(s: &str) -> Result<LayeredConfig> {
    Ok(LayeredConfig::new()
        .with_layer(EnvSource::new())
        .with_layer(StaticSource::from_yaml_str("inline", s)?))
}

/// Directory of the running binary (current directory if unknown).
pub fn base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
