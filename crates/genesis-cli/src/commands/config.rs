use anyhow::{Context, Result};
use genesis_core::config::GenesisConfig;
use genesis_infrastructure::ConfigService;

pub fn show(config: &GenesisConfig) -> Result<()> {
    let mut shown = config.clone();
    if shown.gateway.anon_key.is_some() {
        shown.gateway.anon_key = Some("<redacted>".to_string());
    }
    let rendered = toml::to_string_pretty(&shown).context("Failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}

pub fn path(service: &ConfigService) {
    println!("{}", service.path().display());
}
