//! Profile commands

use crate::config::{Config, KEYS};
use crate::ProfileCommands;
use anyhow::Result;

pub fn handle(action: ProfileCommands, profile: Option<&str>) -> Result<()> {
    match action {
        ProfileCommands::Init => {
            let path = Config::default().save(profile)?;
            println!("Profile initialized at {}", path.display());
        }
        ProfileCommands::Set { key, value } => {
            let mut config = Config::load(profile)?;
            config.set(&key, &value)?;
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ProfileCommands::Get { key } => {
            let config = Config::load(profile)?;
            let value = config.get(&key)?;
            println!("{}: {}", key, value.unwrap_or_else(|| "(not set)".into()));
        }
        ProfileCommands::List => {
            let config = Config::load(profile)?;
            for key in KEYS {
                let value = config.get(key)?;
                println!("{}: {}", key, value.unwrap_or_else(|| "(not set)".into()));
            }
        }
    }
    Ok(())
}
