use crate::error::{ManagerError, Result};
use std::path::Path;

fn map_permission(path: &Path, e: std::io::Error) -> ManagerError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ManagerError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ManagerError::from(e),
    }
}

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| map_permission(path, e))?;
    }
    Ok(())
}

pub fn remove_dir_recursive(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| map_permission(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_and_remove() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());

        remove_dir_recursive(&dir.path().join("a")).unwrap();
        assert!(!dir.path().join("a").exists());
        // removing something absent is fine
        remove_dir_recursive(&dir.path().join("a")).unwrap();
    }
}
