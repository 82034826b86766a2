//! Config commands

use crate::config::Config;
use crate::output::{self, KeyValue, OutputFormat};
use crate::ConfigCommands;
use anyhow::{bail, Result};

pub fn handle(action: ConfigCommands, profile: Option<&str>, format: OutputFormat) -> Result<()> {
    match action {
        ConfigCommands::Init { force } => {
            let path = Config::config_path(profile)?;
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let path = Config::default().save(profile)?;
            output::success(&format!("Configuration initialized at {}", path.display()));
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(profile)?;
            config.set(&key, &value)?;
            config.save(profile)?;
            output::success(&format!("Set {} = {}", key, config.get(&key)?));
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(profile)?;
            println!("{}: {}", key, config.get(&key)?);
        }
        ConfigCommands::List => {
            let config = Config::load(profile)?;
            let entries = config.entries()?;
            format.emit(&config, || {
                entries.into_iter().map(|(k, v)| KeyValue::new(k, v)).collect()
            })?;
        }
    }
    Ok(())
}
