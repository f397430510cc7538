use crate::core::extract::{expected_length, extract_archive, peek_top_folder};
use crate::core::github::{GitHubClient, Release};
use crate::error::{ManagerError, Result};
use futures_util::{StreamExt, TryStreamExt};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Downloads `download_url` and streams it through the extractor into `dest`.
///
/// `size_hint` is used for progress when the server sends no
/// `Content-Length`. There is no retry and no rollback: on failure the error
/// names what was being installed and files already written stay on disk.
/// Cancelling `cancel` stops the body stream and fails with `Cancelled`.
pub async fn install<P, W>(
    client: &GitHubClient,
    download_url: &str,
    size_hint: u64,
    dest: &Path,
    cancel: &CancellationToken,
    on_progress: P,
    on_warning: W,
) -> Result<PathBuf>
where
    P: FnMut(f64) + Send + 'static,
    W: FnMut(&str) + Send + 'static,
{
    download_and_extract(client, download_url, size_hint, dest, cancel, on_progress, on_warning)
        .await
        .map_err(|e| e.installing(artifact_name(download_url)))
}

/// Selects the release's archive and installs it.
pub async fn install_release<P, W>(
    client: &GitHubClient,
    release: &Release,
    dest: &Path,
    cancel: &CancellationToken,
    on_progress: P,
    on_warning: W,
) -> Result<PathBuf>
where
    P: FnMut(f64) + Send + 'static,
    W: FnMut(&str) + Send + 'static,
{
    let asset = release
        .installable_asset()
        .ok_or_else(|| ManagerError::NoInstallableAsset {
            release: release.tag_name.clone(),
        })?;

    info!(release = %release.tag_name, asset = %asset.name, "installing release");
    install(
        client,
        &asset.browser_download_url,
        asset.size,
        dest,
        cancel,
        on_progress,
        on_warning,
    )
    .await
}

/// Installs from an archive already on disk; its length drives progress.
pub fn install_file<P, W>(
    archive: &Path,
    dest: &Path,
    on_progress: P,
    on_warning: W,
) -> Result<PathBuf>
where
    P: FnMut(f64),
    W: FnMut(&str),
{
    let label = archive.display().to_string();
    let run = || -> Result<PathBuf> {
        let file = File::open(archive)?;
        let size = file.metadata()?.len();
        extract_archive(io::BufReader::new(file), size, dest, on_progress, on_warning)
    };
    run().map_err(|e| e.installing(label))
}

/// Folder a local archive would unpack into, read from its first usable entry.
pub fn archive_top_folder(archive: &Path) -> Result<Option<PathBuf>> {
    let run = || -> Result<Option<PathBuf>> {
        let file = File::open(archive)?;
        peek_top_folder(io::BufReader::new(file))
    };
    run().map_err(|e| e.installing(archive.display().to_string()))
}

async fn download_and_extract<P, W>(
    client: &GitHubClient,
    download_url: &str,
    size_hint: u64,
    dest: &Path,
    cancel: &CancellationToken,
    on_progress: P,
    on_warning: W,
) -> Result<PathBuf>
where
    P: FnMut(f64) + Send + 'static,
    W: FnMut(&str) + Send + 'static,
{
    debug!(url = download_url, "starting download");

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ManagerError::Cancelled),
        response = client.get(download_url).send() => response?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(ManagerError::Download {
            url: download_url.to_string(),
            status: status.to_string(),
        });
    }

    let total = expected_length(response.content_length(), size_hint).unwrap_or(0);
    debug!(total, "download accepted");

    let body = response
        .bytes_stream()
        .map_err(io::Error::other)
        .take_until(cancel.clone().cancelled_owned());
    let reader = SyncIoBridge::new(StreamReader::new(Box::pin(body)));

    let dest = dest.to_path_buf();
    let extracted = tokio::task::spawn_blocking(move || {
        extract_archive(reader, total, &dest, on_progress, on_warning)
    })
    .await?;

    if cancel.is_cancelled() {
        return Err(ManagerError::Cancelled);
    }

    let top = extracted?;
    info!(path = %top.display(), "extracted");
    Ok(top)
}

/// Last path segment of a download URL, used to label errors.
fn artifact_name(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|s| !s.is_empty()))
        .unwrap_or(url)
        .to_string()
}
