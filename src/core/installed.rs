use crate::error::{ManagerError, Result};
use crate::utils::fs;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static FOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(GE-Proton|Proton-GE)").expect("installed folder pattern is valid")
});

/// Whether a directory name looks like an installed GE-Proton build.
pub fn is_ge_folder(name: &str) -> bool {
    FOLDER_PATTERN.is_match(name)
}

/// Installed GE-Proton folders under `install_dir`, sorted by name.
///
/// A missing directory simply has nothing installed.
pub fn list_installed(install_dir: &Path) -> Result<Vec<String>> {
    if !install_dir.exists() {
        return Ok(vec![]);
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(install_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_ge_folder(name) {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Rejects anything that is not a plain single path segment.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(ManagerError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Recursively deletes one installed folder and returns its path.
pub fn remove_installed(install_dir: &Path, name: &str) -> Result<PathBuf> {
    validate_name(name)?;

    if !list_installed(install_dir)?.iter().any(|n| n == name) {
        return Err(ManagerError::NotInstalled {
            name: name.to_string(),
        });
    }

    let path = install_dir.join(name);
    fs::remove_dir_recursive(&path)?;
    tracing::info!(path = %path.display(), "removed installed folder");
    Ok(path)
}
