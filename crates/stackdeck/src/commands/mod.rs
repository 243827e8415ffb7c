pub mod export;
pub mod init;
pub mod render;
pub mod simulate;
pub mod state;

use std::path::Path;

use anyhow::Context;
use stackdeck_core::StackConfig;
use stackdeck_state::DeploymentStore;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "stackdeck.toml";

/// Load the explicit config, else `./stackdeck.toml`, else built-in defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StackConfig> {
    match path {
        Some(path) => StackConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                debug!(path = %default.display(), "using config from working directory");
                StackConfig::from_file(default)
                    .with_context(|| format!("failed to load {}", default.display()))
            } else {
                Ok(StackConfig::default())
            }
        }
    }
}

pub fn open_store(config: &StackConfig) -> anyhow::Result<DeploymentStore> {
    DeploymentStore::from_config(config).context("failed to build deployment store")
}
