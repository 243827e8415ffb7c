use std::path::{Path, PathBuf};

use stackdeck_core::StackConfig;

use super::DEFAULT_CONFIG_FILE;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    let output = write_scaffold(path, force)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

pub fn write_scaffold(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    let output = dir.join(DEFAULT_CONFIG_FILE);
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }
    std::fs::write(&output, StackConfig::scaffold().to_toml_string()?)?;
    Ok(output)
}
