//! Streaming `.tar.gz` extraction.
//!
//! Entries are read one at a time from a gzip-decoded tar stream and written
//! under a destination root. Entry names are untrusted: they are cleaned
//! lexically and anything that would land outside the root is skipped.

use crate::error::{ManagerError, Result};
use flate2::read::GzDecoder;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, warn};

/// Mode used for parent directories the archive does not declare.
const PARENT_DIR_MODE: u32 = 0o755;

/// Counts bytes pulled through it and reports the fraction done.
///
/// With no known total the callback is never invoked. The fraction is
/// clamped to 1.0 so an undersized hint cannot overshoot.
pub struct ProgressReader<R, F> {
    inner: R,
    bytes_read: u64,
    total: Option<u64>,
    on_progress: F,
}

impl<R: Read, F: FnMut(f64)> ProgressReader<R, F> {
    pub fn new(inner: R, total: Option<u64>, on_progress: F) -> Self {
        Self {
            inner,
            bytes_read: 0,
            total: total.filter(|t| *t > 0),
            on_progress,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read, F: FnMut(f64)> Read for ProgressReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.bytes_read += n as u64;
            if let Some(total) = self.total {
                let fraction = (self.bytes_read as f64 / total as f64).min(1.0);
                (self.on_progress)(fraction);
            }
        }
        Ok(n)
    }
}

/// Transport length when positive, otherwise the catalog size hint.
pub fn expected_length(content_length: Option<u64>, size_hint: u64) -> Option<u64> {
    match content_length {
        Some(len) if len > 0 => Some(len),
        _ if size_hint > 0 => Some(size_hint),
        _ => None,
    }
}

/// Lexical path cleaning: collapses separators, drops `.` and resolves `..`
/// against preceding components. Rooted paths stay rooted and never climb
/// above `/`. An empty result becomes `.`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Cleans an entry name and returns it relative to the destination root, or
/// `None` when the entry must be skipped (`.`, `/`, or anything starting with
/// `..`). A leading `/` is treated as relative to the root.
pub fn sanitize_entry_name(name: &str) -> Option<PathBuf> {
    let cleaned = clean_path(name);
    if cleaned == "." || cleaned == "/" || cleaned.starts_with("..") {
        return None;
    }
    Some(PathBuf::from(cleaned.trim_start_matches('/')))
}

/// Strips one leading `../` from a cleaned link target. This keeps the common
/// sibling-link layout working but does not jail absolute targets.
pub fn sanitize_link_target(target: &str) -> String {
    let cleaned = clean_path(target);
    if cleaned.starts_with("..") {
        if let Some(stripped) = cleaned.strip_prefix("../") {
            return stripped.to_string();
        }
    }
    cleaned
}

fn top_level_segment(relative: &Path) -> Option<PathBuf> {
    relative.components().next().map(|c| PathBuf::from(c.as_os_str()))
}

/// Decompresses and unpacks a gzip'd tar stream under `dest`.
///
/// `size_hint` is the expected compressed length (0 when unknown) and drives
/// `on_progress`. Symlinks that cannot be created are reported through
/// `on_warning` and skipped. Returns the path of the first top-level folder
/// seen; an archive without any usable entry is an error. Files written
/// before a failure are left in place.
pub fn extract_archive<R, P, W>(
    stream: R,
    size_hint: u64,
    dest: &Path,
    on_progress: P,
    mut on_warning: W,
) -> Result<PathBuf>
where
    R: Read,
    P: FnMut(f64),
    W: FnMut(&str),
{
    let reader = ProgressReader::new(stream, Some(size_hint), on_progress);
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut top_folder: Option<PathBuf> = None;

    let entries = archive
        .entries()
        .map_err(|e| ManagerError::archive("open archive", e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ManagerError::archive("read tar", e))?;
        let kind = entry.header().entry_type();
        if kind.is_pax_global_extensions() || kind.is_pax_local_extensions() {
            continue;
        }

        let raw_name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let Some(relative) = sanitize_entry_name(&raw_name) else {
            debug!(entry = %raw_name, "skipping unsafe archive entry");
            continue;
        };

        if crosses_symlink(dest, &relative) {
            debug!(entry = %raw_name, "skipping archive entry below a symlink");
            continue;
        }

        if top_folder.is_none() {
            top_folder = top_level_segment(&relative);
        }

        let target = dest.join(&relative);
        let mode = entry.header().mode().unwrap_or(0o644) & 0o7777;

        match kind {
            EntryType::Directory => create_dir_all_mode(&target, mode)?,
            EntryType::Regular | EntryType::Continuous => {
                create_parent(&target)?;
                remove_symlink(&target)?;
                let mut file = open_truncate(&target, mode)?;
                io::copy(&mut entry, &mut file)?;
            }
            EntryType::Symlink => {
                create_parent(&target)?;
                let raw_link = entry
                    .link_name_bytes()
                    .map(|b| String::from_utf8_lossy(&b).into_owned())
                    .unwrap_or_default();
                let link = sanitize_link_target(&raw_link);
                if let Err(e) = replace_symlink(&link, &target) {
                    let message = format!(
                        "Symlink create failed for {} -> {}: {} (continuing)",
                        target.display(),
                        link,
                        e
                    );
                    warn!("{message}");
                    on_warning(&message);
                }
            }
            other => debug!(entry = %raw_name, kind = ?other, "ignoring archive entry type"),
        }
    }

    // Finish the gzip member (trailer checksum included), then drain whatever
    // follows so progress reaches the end of the stream.
    let mut decoder = archive.into_inner();
    io::copy(&mut decoder, &mut io::sink())
        .map_err(|e| ManagerError::archive("finish gzip", e))?;
    let mut reader = decoder.into_inner();
    io::copy(&mut reader, &mut io::sink())
        .map_err(|e| ManagerError::archive("drain stream", e))?;
    debug!(bytes = reader.bytes_read(), "archive stream consumed");

    let top = top_folder.ok_or(ManagerError::MissingTopFolder)?;
    Ok(dest.join(top))
}

/// Reads entry headers until the first usable name and returns its top-level
/// folder, without writing anything.
pub fn peek_top_folder<R: Read>(stream: R) -> Result<Option<PathBuf>> {
    let mut archive = Archive::new(GzDecoder::new(stream));
    let entries = archive
        .entries()
        .map_err(|e| ManagerError::archive("open archive", e))?;

    for entry in entries {
        let entry = entry.map_err(|e| ManagerError::archive("read tar", e))?;
        let kind = entry.header().entry_type();
        if kind.is_pax_global_extensions() || kind.is_pax_local_extensions() {
            continue;
        }
        let raw_name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if let Some(relative) = sanitize_entry_name(&raw_name) {
            return Ok(top_level_segment(&relative));
        }
    }
    Ok(None)
}

/// True when an existing directory between `dest` and the entry's own name is
/// a symlink. Writing below it would follow the link out of `dest`.
fn crosses_symlink(dest: &Path, relative: &Path) -> bool {
    let Some(parent) = relative.parent() else {
        return false;
    };

    let mut current = dest.to_path_buf();
    for component in parent.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return true,
            Ok(_) => {}
            // nothing exists below a missing component
            Err(_) => return false,
        }
    }
    false
}

fn create_dir_all_mode(path: &Path, mode: u32) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path)?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => create_dir_all_mode(parent, PARENT_DIR_MODE),
        None => Ok(()),
    }
}

fn open_truncate(path: &Path, mode: u32) -> Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(options.open(path)?)
}

/// Files never write through a symlink sitting at their own path.
fn remove_symlink(target: &Path) -> io::Result<()> {
    if fs::symlink_metadata(target).is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(target)?;
    }
    Ok(())
}

/// Creates `target -> link`, replacing a symlink left by an earlier extraction.
fn replace_symlink(link: &str, target: &Path) -> io::Result<()> {
    remove_symlink(target)?;
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(link, target)
    }
    #[cfg(not(unix))]
    {
        let _ = (link, target);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symbolic links are not supported on this platform",
        ))
    }
}
