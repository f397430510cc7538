pub mod config;
pub mod extract;
pub mod github;
pub mod install;
pub mod install_dir;
pub mod installed;
pub mod selector;
pub mod session;
