use stackdeck_core::{ConfigFormat, StackConfig};

pub fn render(config: &StackConfig, format: ConfigFormat) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    print!("{}", store.generate(format));
    Ok(())
}
