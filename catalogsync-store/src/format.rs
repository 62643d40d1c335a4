use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// On-disk config format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
    Ts,
}

impl ConfigFormat {
    /// Infers the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> StoreResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yml" | "yaml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "ts" => Ok(Self::Ts),
            "" => Err(StoreError::UnsupportedFormat(path.display().to_string())),
            other => Err(StoreError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    /// Canonical extension, without the dot.
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Ts => "ts",
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "ts" | "typescript" => Ok(Self::Ts),
            other => Err(format!("unknown format '{other}', expected yaml, json or ts")),
        }
    }
}

/// Returns `path` with its extension adjusted to `format`.
///
/// A path that already carries an extension of the requested format is
/// returned unchanged, so `prices.yml` stays `prices.yml` for YAML.
pub fn with_format_extension(path: &Path, format: ConfigFormat) -> PathBuf {
    match ConfigFormat::from_path(path) {
        Ok(current) if current == format => path.to_path_buf(),
        _ => path.with_extension(format.extension()),
    }
}
