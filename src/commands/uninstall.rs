use crate::core::{config::Config, installed};
use crate::error::{ManagerError, Result};
use dialoguer::Confirm;
use std::path::Path;

pub fn uninstall(name: &str, dir: Option<&Path>, assume_yes: bool) -> Result<()> {
    let config = Config::load()?;
    let install_dir = config.resolve_install_dir(dir)?;

    installed::validate_name(name)?;
    let current = installed::list_installed(&install_dir)?;
    if !current.iter().any(|n| n == name) {
        if !current.is_empty() {
            println!("Installed versions:");
            for n in &current {
                println!("  • {n}");
            }
        }
        return Err(ManagerError::NotInstalled {
            name: name.to_string(),
        });
    }

    if !assume_yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete '{name}' from {}?",
                install_dir.display()
            ))
            .default(false)
            .interact()
            .map_err(|e| ManagerError::Io(std::io::Error::other(e)))?;

        if !confirmed {
            println!("Uninstall cancelled.");
            return Ok(());
        }
    }

    let removed = installed::remove_installed(&install_dir, name)?;
    println!("✅ Removed {}", removed.display());

    let remaining = installed::list_installed(&install_dir)?;
    if remaining.is_empty() {
        println!("No versions remaining.");
    } else {
        println!("\nRemaining installed versions:");
        for n in remaining {
            println!("  • {n}");
        }
    }

    Ok(())
}
