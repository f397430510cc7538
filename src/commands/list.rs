use crate::core::{config::Config, installed};
use crate::error::Result;
use std::path::Path;

pub fn list_installed(dir: Option<&Path>) -> Result<()> {
    let config = Config::load()?;
    let install_dir = config.resolve_install_dir(dir)?;
    let installed = installed::list_installed(&install_dir)?;

    println!("Install directory: {}", install_dir.display());
    println!();

    if installed.is_empty() {
        println!("No GE-Proton versions installed.");
        println!();
        println!("To install the latest release, run:");
        println!("  protonge install latest");
        return Ok(());
    }

    println!("Installed GE-Proton versions:");
    for name in installed.iter() {
        println!("  • {name}");
    }
    println!();
    println!("Found {} installed GE-Proton folders.", installed.len());

    Ok(())
}
