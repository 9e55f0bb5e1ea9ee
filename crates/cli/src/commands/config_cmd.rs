//! `solace config`: Show the effective configuration.

use solace_config::AppConfig;

pub fn show(config: &AppConfig) -> anyhow::Result<()> {
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", config.to_toml()?);
    Ok(())
}
