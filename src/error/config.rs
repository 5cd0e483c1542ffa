use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("No collection file found (set --config or create reqpilot.toml).")]
    NotFound,
    #[error("Failed to read data rows '{path}': {source}")]
    ReadDataRows {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Data rows in '{path}' must be a JSON array of objects: {source}")]
    ParseDataRows {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid test definition: {source}")]
    InvalidTestDefinition {
        #[source]
        source: serde_json::Error,
    },
    #[error("Test definition must be an object with a string 'type' field.")]
    TestDefinitionMissingType,
}
