use crate::commands::{cancel_on_ctrl_c, client};
use crate::core::config::Config;
use crate::core::github::{format_release_label, Release};
use crate::core::install::{archive_top_folder, install_file, install_release};
use crate::error::{ManagerError, Result};
use crate::utils::format::humanize_bytes;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

const PROGRESS_SCALE: u64 = 1000;

pub struct InstallArgs {
    pub tag: Option<String>,
    pub file: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    pub force: bool,
}

pub async fn install(args: InstallArgs) -> Result<()> {
    let config = Config::load()?;
    let install_dir = config.resolve_install_dir(args.dir.as_deref())?;

    match &args.file {
        Some(file) => install_local(file, &install_dir, args.force).await,
        None => install_remote(&config, args.tag.as_deref(), &install_dir, args.force).await,
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(PROGRESS_SCALE);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} [{bar:40.cyan/blue}] {percent:>3}%  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn progress_callback(bar: &ProgressBar) -> impl FnMut(f64) + Send + 'static {
    let bar = bar.clone();
    move |fraction| bar.set_position((fraction * PROGRESS_SCALE as f64) as u64)
}

fn warning_callback(bar: &ProgressBar) -> impl FnMut(&str) + Send + 'static {
    let bar = bar.clone();
    move |message: &str| bar.println(format!("⚠️  {message}"))
}

async fn install_remote(
    config: &Config,
    tag: Option<&str>,
    install_dir: &Path,
    force: bool,
) -> Result<()> {
    let client = client(config)?;
    let cancel = cancel_on_ctrl_c();

    println!("Fetching available releases...");
    let releases = client.fetch_catalog(&cancel).await?;
    let release = pick_release(&releases, tag)?;
    println!("Resolved release: {}", format_release_label(release));

    // GE archives unpack into a folder named after the release tag.
    ensure_not_installed(install_dir, &release.tag_name, force)?;

    let asset = release
        .installable_asset()
        .ok_or_else(|| ManagerError::NoInstallableAsset {
            release: release.tag_name.clone(),
        })?;
    println!("Downloading {} ({})...", asset.name, humanize_bytes(asset.size));

    let bar = progress_bar();
    bar.set_message(asset.name.clone());
    let result = install_release(
        &client,
        release,
        install_dir,
        &cancel,
        progress_callback(&bar),
        warning_callback(&bar),
    )
    .await;
    bar.finish_and_clear();

    let top = result?;
    println!("✅ Installed release: {}", format_release_label(release));
    println!("   Location: {}", top.display());
    println!();
    println!("Restart Steam and pick it under Properties → Compatibility.");

    Ok(())
}

async fn install_local(file: &Path, install_dir: &Path, force: bool) -> Result<()> {
    println!("Installing from {}...", file.display());
    if let Some(top) = archive_top_folder(file)? {
        ensure_not_installed(install_dir, &top.to_string_lossy(), force)?;
    }

    let bar = progress_bar();
    let (file_owned, dest) = (file.to_path_buf(), install_dir.to_path_buf());
    let (on_progress, on_warning) = (progress_callback(&bar), warning_callback(&bar));
    let result = tokio::task::spawn_blocking(move || {
        install_file(&file_owned, &dest, on_progress, on_warning)
    })
    .await;
    bar.finish_and_clear();

    let top = result??;
    println!("✅ Installed {}", top.display());
    Ok(())
}

/// Refuses to unpack over an existing folder unless `force` is set.
fn ensure_not_installed(install_dir: &Path, folder: &str, force: bool) -> Result<()> {
    if install_dir.join(folder).exists() && !force {
        println!("   Use --force to reinstall over the existing files.");
        return Err(ManagerError::AlreadyInstalled {
            name: folder.to_string(),
        });
    }
    Ok(())
}

/// `None` or `latest` picks the newest release; anything else must match a tag.
pub fn pick_release<'a>(releases: &'a [Release], tag: Option<&str>) -> Result<&'a Release> {
    let wanted = tag.unwrap_or("latest");

    let found = if wanted.eq_ignore_ascii_case("latest") {
        releases.first()
    } else {
        releases
            .iter()
            .find(|r| r.tag_name.eq_ignore_ascii_case(wanted))
    };

    found.ok_or_else(|| {
        if !releases.is_empty() {
            println!("Available releases:");
            for r in releases.iter().take(10) {
                println!("  • {}", r.tag_name);
            }
        }
        ManagerError::ReleaseNotFound {
            tag: wanted.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(tag: &str) -> Release {
        Release {
            tag_name: tag.to_string(),
            name: None,
            prerelease: false,
            draft: false,
            assets: vec![],
            body: None,
            html_url: None,
            created_at: None,
            published_at: None,
        }
    }

    #[test]
    fn test_ensure_not_installed() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("GE-Proton9-5")).unwrap();

        assert!(matches!(
            ensure_not_installed(dir.path(), "GE-Proton9-5", false),
            Err(ManagerError::AlreadyInstalled { name }) if name == "GE-Proton9-5"
        ));
        assert!(ensure_not_installed(dir.path(), "GE-Proton9-5", true).is_ok());
        assert!(ensure_not_installed(dir.path(), "GE-Proton9-6", false).is_ok());
    }

    #[test]
    fn test_pick_release() {
        let releases = vec![release("GE-Proton9-6"), release("GE-Proton9-5")];

        assert_eq!(pick_release(&releases, None).unwrap().tag_name, "GE-Proton9-6");
        assert_eq!(
            pick_release(&releases, Some("latest")).unwrap().tag_name,
            "GE-Proton9-6"
        );
        assert_eq!(
            pick_release(&releases, Some("ge-proton9-5")).unwrap().tag_name,
            "GE-Proton9-5"
        );
        assert!(matches!(
            pick_release(&releases, Some("GE-Proton1-1")),
            Err(ManagerError::ReleaseNotFound { .. })
        ));
        assert!(pick_release(&[], None).is_err());
    }
}
