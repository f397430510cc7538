use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ManagerError>;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API returned 403 (rate limited?). Try setting GITHUB_TOKEN")]
    RateLimited,

    #[error("GitHub API error: {status}: {body}")]
    Api { status: String, body: String },

    #[error("Download failed: {status} for {url}")]
    Download { url: String, status: String },

    #[error("Archive error ({context}): {source}")]
    Archive {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected archive layout (no top folder)")]
    MissingTopFolder,

    #[error("No suitable .tar.gz asset found on release '{release}'")]
    NoInstallableAsset { release: String },

    #[error("Release '{tag}' not found")]
    ReleaseNotFound { tag: String },

    #[error("'{name}' is already installed")]
    AlreadyInstalled { name: String },

    #[error("'{name}' is not installed")]
    NotInstalled { name: String },

    #[error("Invalid name: '{name}'")]
    InvalidName { name: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Home directory not found")]
    HomeDirectoryNotFound,

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Installing {what} failed: {source}")]
    Install {
        what: String,
        #[source]
        source: Box<ManagerError>,
    },
}

impl ManagerError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        ManagerError::ConfigError {
            message: message.into(),
        }
    }

    pub fn archive(context: &'static str, source: std::io::Error) -> Self {
        ManagerError::Archive { context, source }
    }

    /// Wraps `self` with the name of what was being installed.
    pub fn installing<S: Into<String>>(self, what: S) -> Self {
        ManagerError::Install {
            what: what.into(),
            source: Box::new(self),
        }
    }

    /// True when this error, or the error it annotates, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            ManagerError::Cancelled => true,
            ManagerError::Install { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_annotation_keeps_source() {
        let err = ManagerError::MissingTopFolder.installing("GE-Proton9-5.tar.gz");
        assert_eq!(
            err.to_string(),
            "Installing GE-Proton9-5.tar.gz failed: Unexpected archive layout (no top folder)"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_cancelled_sees_through_annotation() {
        assert!(ManagerError::Cancelled.is_cancelled());
        assert!(ManagerError::Cancelled.installing("x").is_cancelled());
        assert!(!ManagerError::RateLimited.is_cancelled());
    }
}
