//! Filesystem-backed config store.

use crate::error::{StoreError, StoreResult};
use crate::format::ConfigFormat;
use crate::store::ConfigStore;
use async_trait::async_trait;
use catalogsync_types::{validate, Config};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

const TS_EXPORT: &str = "export const config";
const TS_DEFAULT_EXPORT: &str = "export default";

/// Stores configs as files; the format follows the path's extension.
#[derive(Debug, Clone, Default)]
pub struct FileConfigStore;

impl FileConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Parses file content into an unvalidated document.
    pub fn parse(path: &Path, format: ConfigFormat, text: &str) -> StoreResult<Value> {
        let parse_err = |message: String| StoreError::Parse {
            path: path.to_path_buf(),
            message,
        };

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str::<Value>(text).map_err(|e| parse_err(e.to_string()))
            }
            ConfigFormat::Json => {
                serde_json::from_str::<Value>(text).map_err(|e| parse_err(e.to_string()))
            }
            ConfigFormat::Ts => {
                let literal = ts_literal(text).ok_or_else(|| {
                    parse_err(format!(
                        "expected a module with `{TS_EXPORT}: Config = {{...}};` as written by catalogsync"
                    ))
                })?;
                serde_json::from_str::<Value>(literal).map_err(|e| {
                    parse_err(format!("config literal is not plain JSON: {e}"))
                })
            }
        }
    }

    /// Renders a config in the given format.
    pub fn render(format: ConfigFormat, config: &Config) -> StoreResult<String> {
        let ser_err = |e: &dyn std::fmt::Display| StoreError::Serialization(e.to_string());
        match format {
            ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| ser_err(&e)),
            ConfigFormat::Json => serde_json::to_string_pretty(config)
                .map(|s| s + "\n")
                .map_err(|e| ser_err(&e)),
            ConfigFormat::Ts => {
                let literal = serde_json::to_string_pretty(config).map_err(|e| ser_err(&e))?;
                Ok(format!(
                    "/**\n * This file is auto-generated by catalogsync.\n * Manual changes may be overwritten.\n */\nimport type {{ Config }} from 'catalogsync';\n\n{TS_EXPORT}: Config = {literal};\n\n{TS_DEFAULT_EXPORT} config;\n"
                ))
            }
        }
    }
}

/// Extracts the JSON object literal from a generated TS module.
fn ts_literal(text: &str) -> Option<&str> {
    let start = text.find(TS_EXPORT)?;
    let rest = &text[start..];
    let rest = &rest[rest.find('=')? + 1..];
    let end = rest.rfind(TS_DEFAULT_EXPORT).unwrap_or(rest.len());
    let literal = rest[..end].trim().trim_end_matches(';').trim_end();
    (!literal.is_empty()).then_some(literal)
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn read(&self, path: &Path) -> StoreResult<Config> {
        let format = ConfigFormat::from_path(path)?;
        debug!("Loading {} configuration from {}", format, path.display());

        let text = fs::read_to_string(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
            _ => StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let raw = Self::parse(path, format, &text)?;
        Ok(validate(&raw)?)
    }

    async fn write(&self, path: &Path, config: &Config) -> StoreResult<()> {
        let format = ConfigFormat::from_path(path)?;
        let content = Self::render(format, config)?;

        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        fs::write(path, content).await.map_err(io_err)?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}
