//! Fetches daemon builds and the coins file.
//!
//! Builds are published as zip archives under an HTML directory listing,
//! one directory per branch. An archive matches when its link mentions
//! the platform and the commit hash and ends in `.zip`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const DEFAULT_RELEASES_URL: &str = "http://54.170.62.22:8000/";
pub const DEFAULT_API_BRANCH: &str = "dev";
pub const DEFAULT_COINS_BRANCH: &str = "test-lightning";
pub const DEFAULT_PLATFORM: &str = "linux";
pub const COINS_URL: &str = "https://raw.githubusercontent.com/KomodoPlatform/coins";

const TEMP_DIR: &str = "temp";
const COINS_FILE: &str = "coins";

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no {platform} archive for {version:?} under branch {branch} or any other branch")]
    ArchiveNotFound {
        version: String,
        platform: String,
        branch: String,
    },
    #[error("archive does not contain {name}")]
    BinaryMissing { name: String },
    #[error("failed to extract archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("coins file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("href pattern compiles")
    })
}

/// Every `href` target in an HTML listing, in document order.
pub fn links(html: &str) -> Vec<String> {
    href_pattern()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// First link naming `platform` and `version` that ends in `.zip`.
pub fn find_archive_link(html: &str, platform: &str, version: &str) -> Option<String> {
    links(html)
        .into_iter()
        .find(|link| link.contains(platform) && link.contains(version) && link.ends_with(".zip"))
}

/// Daemon executable name inside an archive for `platform`.
pub fn binary_name(platform: &str) -> &'static str {
    if platform.starts_with("win") {
        "mm2.exe"
    } else {
        "mm2"
    }
}

pub struct Updater {
    http: Client,
    base_url: String,
    root: PathBuf,
}

impl Updater {
    pub fn new(base_url: &str, root: &Path) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            root: root.to_path_buf(),
        }
    }

    fn branch_url(&self, branch: &str) -> String {
        format!("{}/{}", self.base_url, branch.trim_matches('/'))
    }

    async fn get_text(&self, url: &str) -> Result<String, UpdateError> {
        debug!(%url, "fetching listing");
        Ok(self.http.get(url).send().await?.error_for_status()?.text().await?)
    }

    async fn search_branch(
        &self,
        branch: &str,
        platform: &str,
        version: &str,
    ) -> Result<Option<String>, UpdateError> {
        let listing_url = self.branch_url(branch);
        let html = self.get_text(&listing_url).await?;
        Ok(find_archive_link(&html, platform, version).map(|file| format!("{listing_url}/{file}")))
    }

    /// URL of the archive for `version`, looking in `branch` first and then
    /// in every branch directory of the index.
    pub async fn locate_archive(
        &self,
        branch: &str,
        platform: &str,
        version: &str,
    ) -> Result<String, UpdateError> {
        if let Some(url) = self.search_branch(branch, platform, version).await? {
            return Ok(url);
        }

        let index = self.get_text(&self.base_url).await?;
        for other in links(&index) {
            let other = other.trim_matches('/');
            if other.is_empty() || other.starts_with('.') || other == branch.trim_matches('/') {
                continue;
            }
            match self.search_branch(other, platform, version).await {
                Ok(Some(url)) => {
                    info!(branch = other, "found archive in another branch");
                    return Ok(url);
                }
                Ok(None) => {}
                Err(err) => warn!(branch = other, error = %err, "skipping unreadable branch listing"),
            }
        }

        Err(UpdateError::ArchiveNotFound {
            version: version.to_owned(),
            platform: platform.to_owned(),
            branch: branch.to_owned(),
        })
    }

    /// Download, extract and install the daemon binary. Returns its path.
    pub async fn install_api(
        &self,
        branch: &str,
        platform: &str,
        version: &str,
    ) -> Result<PathBuf, UpdateError> {
        info!(%version, %platform, %branch, "downloading API module");
        let url = self.locate_archive(branch, platform, version).await?;

        let temp = self.root.join(TEMP_DIR);
        fs::create_dir_all(&temp)?;
        let file_name = url.rsplit('/').next().unwrap_or("api.zip");
        let archive = temp.join(file_name);
        let bytes = self.http.get(&url).send().await?.error_for_status()?.bytes().await?;
        fs::write(&archive, &bytes)?;
        info!(path = %archive.display(), size = bytes.len(), "archive saved");

        let installed = install_from_archive(&archive, &temp, &self.root, platform);
        if let Err(err) = fs::remove_dir_all(&temp) {
            warn!(path = %temp.display(), error = %err, "failed to remove temp directory");
        }
        installed
    }

    /// Replace `<root>/coins` with the coins file from `coins_branch`.
    pub async fn update_coins(&self, coins_branch: &str) -> Result<PathBuf, UpdateError> {
        let url = format!("{COINS_URL}/{coins_branch}/coins");
        info!(%url, "downloading coins file");
        let coins: Value = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        let path = self.root.join(COINS_FILE);
        fs::write(&path, serde_json::to_string_pretty(&coins)?)?;
        Ok(path)
    }
}

/// Extract `archive` into `temp` and copy the platform's binary into `root`.
pub fn install_from_archive(
    archive: &Path,
    temp: &Path,
    root: &Path,
    platform: &str,
) -> Result<PathBuf, UpdateError> {
    zip::ZipArchive::new(File::open(archive)?)?.extract(temp)?;
    fs::remove_file(archive)?;

    let name = binary_name(platform);
    let extracted = temp.join(name);
    if !extracted.is_file() {
        return Err(UpdateError::BinaryMissing {
            name: name.to_owned(),
        });
    }
    let target = root.join(name);
    fs::copy(&extracted, &target)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&target, fs::Permissions::from_mode(0o755))?;
    }
    info!(path = %target.display(), "API module installed");
    Ok(target)
}
