use crate::commands::{cancel_on_ctrl_c, client};
use crate::core::{config::Config, github::format_release_label};
use crate::error::Result;
use crate::utils::format::humanize_bytes;

pub async fn list_available_releases(show_assets: bool) -> Result<()> {
    let config = Config::load()?;
    let client = client(&config)?;

    println!("Fetching releases...");
    let releases = client.fetch_catalog(&cancel_on_ctrl_c()).await?;

    if releases.is_empty() {
        println!("No installable releases found.");
        println!("Check: https://github.com/GloriousEggroll/proton-ge-custom/releases");
        return Ok(());
    }

    println!("Available releases:");
    for (i, release) in releases.iter().enumerate() {
        let latest = if i == 0 { " (latest)" } else { "" };
        println!("  {}{}", format_release_label(release), latest);

        if show_assets {
            if let Some(asset) = release.installable_asset() {
                println!("      {} ({})", asset.name, humanize_bytes(asset.size));
            }
        }
    }

    println!();
    println!("Loaded {} releases.", releases.len());
    println!("Install: protonge install <tag>");

    Ok(())
}
