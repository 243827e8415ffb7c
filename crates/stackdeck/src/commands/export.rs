use std::path::{Path, PathBuf};

use anyhow::Context;
use stackdeck_core::{ConfigFormat, StackConfig};
use stackdeck_state::DeploymentStore;
use tracing::info;

pub fn export(config: &StackConfig, out_dir: &Path) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    for path in write_all(&store, out_dir)? {
        println!("✓ Wrote {}", path.display());
    }
    Ok(())
}

/// Write one file per format, named like `kubernetes-wordpress-stack.yaml`.
pub fn write_all(store: &DeploymentStore, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(ConfigFormat::ALL.len());
    for format in ConfigFormat::ALL {
        let path = out_dir.join(format.file_name());
        std::fs::write(&path, store.generate(format))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(format = %format, path = %path.display(), "exported config");
        written.push(path);
    }
    Ok(written)
}
