use crate::core::selector::select_installable_asset;
use crate::error::{ManagerError, Result};
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_RELEASES_URL: &str =
    "https://api.github.com/repos/GloriousEggroll/proton-ge-custom/releases";

pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Environment variable holding an optional bearer token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

pub const PER_PAGE: usize = 100;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Upper bound on the response body kept in API error messages.
pub const ERROR_BODY_LIMIT: usize = 4096;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Release {
    /// Display name, falling back to the tag when the release is unnamed.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.tag_name,
        }
    }

    pub fn installable_asset(&self) -> Option<&Asset> {
        select_installable_asset(&self.assets)
    }
}

/// One-line label used when listing releases.
pub fn format_release_label(release: &Release) -> String {
    let mut label = release.tag_name.clone();
    if release.prerelease {
        label.push_str(" (pre-release)");
    }
    let name = release.display_name();
    if name != release.tag_name {
        label.push_str(" - ");
        label.push_str(name);
    }
    label
}

/// Everything the client needs to talk to the releases endpoint.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub releases_url: String,
    pub user_agent: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            user_agent: default_user_agent(),
            token: token_from_env(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

pub fn default_user_agent() -> String {
    format!("protonge/{}", env!("CARGO_PKG_VERSION"))
}

/// Reads `GITHUB_TOKEN`; an unset or blank variable means no credential.
pub fn token_from_env() -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// A paged source of releases, newest first.
pub trait ReleasePages {
    fn fetch_page(
        &self,
        page: u32,
        per_page: usize,
    ) -> impl Future<Output = Result<Vec<Release>>> + Send;
}

pub struct GitHubClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl GitHubClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .build()?;
        Ok(Self { http, options })
    }

    /// GET request carrying the agent header and, when configured, the bearer token.
    pub fn get(&self, url: &str) -> RequestBuilder {
        let request = self.http.get(url);
        match &self.options.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetches every page of releases and keeps the installable, non-draft ones.
    pub async fn fetch_catalog(&self, cancel: &CancellationToken) -> Result<Vec<Release>> {
        collect_catalog(self, PER_PAGE, cancel).await
    }
}

impl ReleasePages for GitHubClient {
    async fn fetch_page(&self, page: u32, per_page: usize) -> Result<Vec<Release>> {
        debug!(url = %self.options.releases_url, page, "requesting release page");

        let response = self
            .get(&self.options.releases_url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .query(&[("per_page", per_page.to_string()), ("page", page.to_string())])
            .timeout(self.options.timeout)
            .send()
            .await?;

        let response = ensure_catalog_success(response).await?;
        let bytes = response.bytes().await?;
        let releases: Vec<Release> = serde_json::from_slice(&bytes)?;
        Ok(releases)
    }
}

/// Walks pages until one comes back shorter than `per_page`, then filters.
///
/// A page-aligned total costs one extra request that returns an empty page.
pub async fn collect_catalog<S: ReleasePages>(
    source: &S,
    per_page: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Release>> {
    let mut all = Vec::new();
    let mut page = 1u32;

    loop {
        let releases = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ManagerError::Cancelled),
            result = source.fetch_page(page, per_page) => result?,
        };

        let count = releases.len();
        debug!(page, count, "received release page");
        all.extend(releases);

        if count < per_page {
            break;
        }
        page += 1;
    }

    let fetched = all.len();
    let catalog = filter_catalog(all);
    debug!(fetched, kept = catalog.len(), "filtered release catalog");
    Ok(catalog)
}

/// Drops drafts and releases without an installable asset, preserving order.
pub fn filter_catalog(releases: Vec<Release>) -> Vec<Release> {
    releases
        .into_iter()
        .filter(|r| !r.draft)
        .filter(|r| r.installable_asset().is_some())
        .collect()
}

async fn ensure_catalog_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::FORBIDDEN {
        return Err(ManagerError::RateLimited);
    }
    if !status.is_success() {
        let body = read_limited(response, ERROR_BODY_LIMIT).await;
        return Err(api_error(status, &body));
    }
    Ok(response)
}

/// Reads at most `limit` bytes of body; read failures just end the excerpt.
async fn read_limited(mut response: Response, limit: usize) -> Vec<u8> {
    let mut body = Vec::new();
    while body.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            _ => break,
        }
    }
    body.truncate(limit);
    body
}

pub fn api_error(status: StatusCode, body: &[u8]) -> ManagerError {
    let body = &body[..body.len().min(ERROR_BODY_LIMIT)];
    ManagerError::Api {
        status: status.to_string(),
        body: String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn tarball_release(tag: &str) -> Release {
        Release {
            tag_name: tag.to_string(),
            name: Some(tag.to_string()),
            prerelease: false,
            draft: false,
            assets: vec![Asset {
                name: format!("{tag}.tar.gz"),
                browser_download_url: format!("https://example.invalid/{tag}.tar.gz"),
                size: 1024,
                content_type: Some("application/gzip".to_string()),
            }],
            body: None,
            html_url: None,
            created_at: None,
            published_at: None,
        }
    }

    /// Serves `total` releases in pages and records which pages were asked for.
    struct FakePages {
        releases: Vec<Release>,
        requested: Mutex<Vec<u32>>,
    }

    impl FakePages {
        fn new(releases: Vec<Release>) -> Self {
            Self {
                releases,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn with_total(total: usize) -> Self {
            Self::new((0..total).map(|i| tarball_release(&format!("GE-Proton{i}"))).collect())
        }

        fn requests(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl ReleasePages for FakePages {
        async fn fetch_page(&self, page: u32, per_page: usize) -> Result<Vec<Release>> {
            self.requested.lock().unwrap().push(page);
            let start = (page as usize - 1) * per_page;
            Ok(self
                .releases
                .iter()
                .skip(start)
                .take(per_page)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn test_pagination_stops_on_short_page() {
        let source = FakePages::with_total(250);
        let catalog = collect_catalog(&source, PER_PAGE, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(source.requests(), vec![1, 2, 3]);
        assert_eq!(catalog.len(), 250);
        assert_eq!(catalog[0].tag_name, "GE-Proton0");
        assert_eq!(catalog[249].tag_name, "GE-Proton249");
    }

    #[tokio::test]
    async fn test_page_aligned_total_needs_empty_terminator() {
        let source = FakePages::with_total(200);
        let catalog = collect_catalog(&source, PER_PAGE, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(source.requests(), vec![1, 2, 3]);
        assert_eq!(catalog.len(), 200);
    }

    #[tokio::test]
    async fn test_empty_catalog_is_single_request() {
        let source = FakePages::with_total(0);
        let catalog = collect_catalog(&source, PER_PAGE, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(source.requests(), vec![1]);
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_before_requesting() {
        let source = FakePages::with_total(10);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = collect_catalog(&source, PER_PAGE, &cancel).await;
        assert!(matches!(result, Err(ManagerError::Cancelled)));
        assert!(source.requests().is_empty());
    }

    /// Announces each request and then never answers.
    struct StalledPages {
        started: Notify,
    }

    impl ReleasePages for StalledPages {
        async fn fetch_page(&self, _page: u32, _per_page: usize) -> Result<Vec<Release>> {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_page_request() {
        let source = StalledPages {
            started: Notify::new(),
        };
        let cancel = CancellationToken::new();

        let (result, ()) = tokio::join!(collect_catalog(&source, PER_PAGE, &cancel), async {
            source.started.notified().await;
            cancel.cancel();
        });
        assert!(matches!(result, Err(ManagerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_drafts_and_untarred_releases_are_dropped() {
        let mut draft = tarball_release("GE-Proton9-6");
        draft.draft = true;
        let mut no_tarball = tarball_release("GE-Proton9-4");
        no_tarball.assets[0].name = "GE-Proton9-4.zip".to_string();
        let releases = vec![
            draft,
            tarball_release("GE-Proton9-5"),
            no_tarball,
            tarball_release("GE-Proton9-3"),
        ];

        let source = FakePages::new(releases);
        let catalog = collect_catalog(&source, PER_PAGE, &CancellationToken::new())
            .await
            .unwrap();
        let tags: Vec<&str> = catalog.iter().map(|r| r.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["GE-Proton9-5", "GE-Proton9-3"]);
    }

    #[test]
    fn test_release_deserializes_github_payload() {
        let json = r#"[{
            "tag_name": "GE-Proton9-5",
            "name": null,
            "prerelease": false,
            "draft": false,
            "body": "notes",
            "html_url": "https://github.com/GloriousEggroll/proton-ge-custom/releases/tag/GE-Proton9-5",
            "created_at": "2024-05-01T10:00:00Z",
            "published_at": null,
            "assets": [{
                "name": "GE-Proton9-5.tar.gz",
                "browser_download_url": "https://github.com/x/GE-Proton9-5.tar.gz",
                "size": 440401920,
                "content_type": "application/gzip"
            }]
        }]"#;
        let releases: Vec<Release> = serde_json::from_str(json).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].display_name(), "GE-Proton9-5");
        assert_eq!(releases[0].assets[0].size, 440_401_920);
        assert!(releases[0].created_at.is_some());
        assert!(releases[0].published_at.is_none());
    }

    #[test]
    fn test_format_release_label() {
        let mut release = tarball_release("GE-Proton9-5");
        assert_eq!(format_release_label(&release), "GE-Proton9-5");

        release.name = Some("GE-Proton 9.5".to_string());
        release.prerelease = true;
        assert_eq!(
            format_release_label(&release),
            "GE-Proton9-5 (pre-release) - GE-Proton 9.5"
        );
    }

    #[test]
    fn test_api_error_truncates_and_trims_body() {
        let body = format!("  {}", "x".repeat(ERROR_BODY_LIMIT * 2));
        match api_error(StatusCode::NOT_FOUND, body.as_bytes()) {
            ManagerError::Api { status, body } => {
                assert_eq!(status, "404 Not Found");
                assert_eq!(body.len(), ERROR_BODY_LIMIT - 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
