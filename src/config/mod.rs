//! Collection files: settings, environments and requests.
mod loader;
pub mod types;

#[cfg(test)]
mod tests;

pub(crate) use loader::DEFAULT_CONFIG_FILES;
pub use loader::{load_config, load_config_file, load_data_rows};
pub use types::{CollectionFile, DurationValue, EnvironmentConfig, Settings};
