//! Configuration view and validation commands: `katana-builders config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use katana_builders::config::{BuildersConfig, BuildersToml, CONFIG_DIR, CONFIG_FILE};

    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Builders Configuration");
            println!("======================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                BuildersToml::load(&config_path)?
            } else {
                println!("No builders.toml found at {}", config_path.display());
                println!("Using default configuration.");
                BuildersToml::default()
            };
            println!();

            println!("[page]");
            println!("  main_codebase = \"{}\"", toml.page.main_codebase);
            println!("  url_debounce_ms = {}", toml.page.url_debounce_ms);
            println!("  hide_unstable = {}", toml.page.hide_unstable);
            println!();
            println!("[table]");
            println!(
                "  default_sort_column = \"{}\"",
                toml.table.default_sort_column
            );
            println!(
                "  default_sort_direction = \"{}\"",
                toml.table.default_sort_direction
            );
            println!();

            println!("Effective values (with env overrides):");
            let config = BuildersConfig::new(project_dir.to_path_buf())?;
            println!("  main_codebase = \"{}\"", config.main_codebase());
            println!("  url_debounce_ms = {}", config.url_debounce().as_millis());
            println!();

            if !config_path.exists() {
                println!("Run 'katana-builders config init' to create a builders.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No builders.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = BuildersToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("builders.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)?;
            }

            BuildersToml::default().save(&config_path)?;

            println!("Created builders.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [page] main_codebase, url_debounce_ms, hide_unstable");
            println!("  - [table] default_sort_column, default_sort_direction");
            println!();
        }
    }

    Ok(())
}
