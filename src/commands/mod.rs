pub mod available;
pub mod dir;
pub mod install;
pub mod list;
pub mod uninstall;

use crate::core::{config::Config, github::GitHubClient};
use crate::error::Result;
use tokio_util::sync::CancellationToken;

/// Token that trips on Ctrl-C so long network calls stop promptly.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

pub(crate) fn client(config: &Config) -> Result<GitHubClient> {
    GitHubClient::new(config.client_options())
}
