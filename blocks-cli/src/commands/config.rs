use crate::config::{BlocksConfig, ConfigLoader};
use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
    /// Write the current configuration to the user config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs, config: &BlocksConfig) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(config),
        ConfigCommands::Path => show_paths(),
        ConfigCommands::Init { force } => {
            init_config(config, &ConfigLoader::user_config_path(), force)
        }
    }
}

fn show_config(config: &BlocksConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths() -> Result<()> {
    println!("User config:    {}", ConfigLoader::user_config_path().display());
    println!("Project config: {}", ConfigLoader::project_config_path().display());
    Ok(())
}

fn init_config(config: &BlocksConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    ConfigLoader::save_to_path(config, path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(subcommand)]
            cmd: ConfigCommands,
        }

        let cli = TestCli::parse_from(["test", "show"]);
        assert!(matches!(cli.cmd, ConfigCommands::Show));

        let cli = TestCli::parse_from(["test", "path"]);
        assert!(matches!(cli.cmd, ConfigCommands::Path));

        let cli = TestCli::parse_from(["test", "init", "--force"]);
        assert!(matches!(cli.cmd, ConfigCommands::Init { force: true }));
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nobleblocks").join("config.toml");

        let mut config = BlocksConfig::default();
        config.app.name = "Papers".to_string();
        init_config(&config, &path, false).unwrap();

        let loaded = ConfigLoader::load_layers(&[path]).unwrap();
        assert_eq!(loaded.app.name, "Papers");
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[app]\nname = \"Kept\"\n").unwrap();

        assert!(init_config(&BlocksConfig::default(), &path, false).is_err());
        let loaded = ConfigLoader::load_layers(&[path.clone()]).unwrap();
        assert_eq!(loaded.app.name, "Kept");

        init_config(&BlocksConfig::default(), &path, true).unwrap();
        let loaded = ConfigLoader::load_layers(&[path]).unwrap();
        assert_eq!(loaded.app.name, "NobleBlocks");
    }
}
