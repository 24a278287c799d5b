use {anyhow::Result, clap::Subcommand};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file path in use (or where one would be created).
    Path,
    /// Print the effective configuration.
    Show,
    /// Write a config file with default values if none exists.
    Init,
}

pub fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", skillbridge_config::find_or_default_config_path().display());
        },
        ConfigAction::Show => {
            let config = skillbridge_config::discover_and_load();
            print!("{}", toml::to_string_pretty(&config)?);
        },
        ConfigAction::Init => {
            let path = skillbridge_config::find_or_default_config_path();
            if path.exists() {
                eprintln!("Config already exists at {}", path.display());
                return Ok(());
            }
            let path = skillbridge_config::save_config(&Default::default())?;
            println!("Wrote {}", path.display());
        },
    }
    Ok(())
}
