//! Config subcommand handlers.

use std::path::Path;

use eventdekho_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

/// Fold global CLI flags into a loaded config.
pub fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.api_url {
        cfg.api_url = Some(url.clone());
    }
    if global.insecure {
        cfg.insecure = true;
    }
    if let Some(secs) = global.timeout {
        cfg.timeout_secs = Some(secs);
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let mut cfg = config::load_config()?;
            apply_overrides(&mut cfg, global);
            if cfg.session_cookie.is_some() {
                cfg.session_cookie = Some("<redacted>".into());
            }
            let rendered = toml::to_string_pretty(&cfg)?;
            print!("{rendered}");

            let base_url = cfg.to_backend_config()?.base_url;
            println!("\n# resolved api url: {base_url}");
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::config_path();
            init_at(&path, force)?;
            if !global.quiet {
                eprintln!("Wrote default configuration to {}", path.display());
            }
            Ok(())
        }
    }
}

fn init_at(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists {
            path: path.display().to_string(),
        });
    }
    config::save_config_to(&Config::default(), path)?;
    Ok(())
}
