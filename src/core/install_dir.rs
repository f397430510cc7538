use crate::error::{ManagerError, Result};
use crate::utils::fs;
use std::path::{Path, PathBuf};

/// Steam compatibility-tool directories, most preferred first.
pub fn candidate_dirs(home: &Path) -> Vec<PathBuf> {
    [
        ".local/share/Steam/compatibilitytools.d",
        ".steam/steam/compatibilitytools.d",
        ".steam/root/compatibilitytools.d",
        ".var/app/com.valvesoftware.Steam/data/Steam/compatibilitytools.d",
    ]
    .iter()
    .map(|rel| home.join(rel))
    .collect()
}

/// First existing candidate under `home`, else the first candidate, created.
pub fn resolve_install_dir_in(home: &Path) -> Result<PathBuf> {
    let candidates = candidate_dirs(home);

    if let Some(existing) = candidates.iter().find(|c| c.is_dir()) {
        return Ok(existing.clone());
    }

    let fallback = candidates
        .into_iter()
        .next()
        .ok_or_else(|| ManagerError::config_error("no install directory candidates"))?;
    fs::ensure_dir_exists(&fallback)?;
    Ok(fallback)
}

pub fn resolve_install_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(ManagerError::HomeDirectoryNotFound)?;
    resolve_install_dir_in(&home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefers_existing_candidate() {
        let home = TempDir::new().unwrap();
        let flatpak = home
            .path()
            .join(".var/app/com.valvesoftware.Steam/data/Steam/compatibilitytools.d");
        std::fs::create_dir_all(&flatpak).unwrap();

        assert_eq!(resolve_install_dir_in(home.path()).unwrap(), flatpak);
    }

    #[test]
    fn test_creates_first_candidate_when_none_exist() {
        let home = TempDir::new().unwrap();
        let dir = resolve_install_dir_in(home.path()).unwrap();
        assert_eq!(dir, home.path().join(".local/share/Steam/compatibilitytools.d"));
        assert!(dir.is_dir());
    }
}
