use crate::core::{config, config::Config, install_dir};
use crate::error::{ManagerError, Result};

pub fn show_install_dir() -> Result<()> {
    let config = Config::load()?;
    let resolved = config.resolve_install_dir(None)?;

    println!("Install directory: {}", resolved.display());
    println!("Config file: {}", config::get_config_path()?.display());

    if config.install_dir.is_none() {
        let home = dirs::home_dir().ok_or(ManagerError::HomeDirectoryNotFound)?;
        println!();
        println!("Detected from:");
        for candidate in install_dir::candidate_dirs(&home) {
            let marker = if candidate == resolved {
                "*"
            } else if candidate.is_dir() {
                "+"
            } else {
                " "
            };
            println!("  {marker} {}", candidate.display());
        }
    }

    let token = if config.token().is_some() {
        "set"
    } else {
        "not set (60 requests/hour limit)"
    };
    println!();
    println!("GitHub token: {token}");

    Ok(())
}
