use crate::client::ClientConfig;
use crate::env_resolver::EnvResolver;
use crate::error::{ConfigError, ConfigResult};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Supported file formats for configuration
#[derive(Debug, Clone, PartialEq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Detect file format from extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            Some("json") => Ok(FileFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }
}

/// Reads a [`ClientConfig`]: parse, resolve placeholders, apply env overrides, validate
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    resolver: EnvResolver,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: EnvResolver) -> Self {
        Self { resolver }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<ClientConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let format = FileFormat::from_path(path)?;
        debug!(path = %path.display(), ?format, "loading client configuration");

        self.parse_content(&content, format)
    }

    /// Load `path` if given, otherwise start from defaults; env overrides apply either way
    pub fn load_optional<P: AsRef<Path>>(&self, path: Option<P>) -> ConfigResult<ClientConfig> {
        match path {
            Some(path) => self.load_from_file(path),
            None => ClientConfig::from_env(),
        }
    }

    pub fn parse_content(&self, content: &str, format: FileFormat) -> ConfigResult<ClientConfig> {
        let raw: JsonValue = match format {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        };
        // An empty YAML document is null
        let raw = if raw.is_null() { JsonValue::Object(Default::default()) } else { raw };

        let resolved = self.resolver.resolve(&raw)?;
        let mut config: ClientConfig = serde_json::from_value(resolved)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }
}
