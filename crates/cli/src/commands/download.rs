use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use igsync_core::error::BoxError;
use igsync_core::sync::{DownloadProgress, Fetcher};
use igsync_core::Archive;
use reqwest::blocking::Client;
use tracing::debug;

/// Blocking HTTP fetcher for CDN media URLs.
pub(crate) struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub(crate) fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("igsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

/// Sibling file a download is streamed into before it is moved into place.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> std::result::Result<(), BoxError> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let partial = partial_path(dest);
        let mut file = File::create(&partial)?;
        let bytes = response.copy_to(&mut file)?;
        drop(file);
        fs::rename(&partial, dest)?;
        debug!(url, bytes, "fetched");
        Ok(())
    }
}

pub fn run(archive: &Archive, media_dir: &Path) -> Result<()> {
    let fetcher = HttpFetcher::new()?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    archive.download_pending(
        media_dir,
        &fetcher,
        Some(&mut |progress: DownloadProgress| match progress {
            DownloadProgress::Start { total } => {
                pb.set_length(total as u64);
                pb.set_position(0);
                pb.set_message("Downloading media...");
            }
            DownloadProgress::Fetched { path, .. } => {
                pb.inc(1);
                pb.set_message(format!("-> {}", path.display()));
            }
            DownloadProgress::Skipped { .. } => {
                pb.inc(1);
            }
            DownloadProgress::Unplaceable { url, reason } => {
                pb.inc(1);
                pb.println(format!("  skipped {url}: {reason}"));
            }
            DownloadProgress::Complete {
                fetched,
                skipped,
                unplaceable,
            } => {
                pb.finish_with_message(format!(
                    "{fetched} downloaded, {skipped} already on disk, {unplaceable} left pending"
                ));
            }
        }),
    )?;

    println!("Download complete. Media is in {}", media_dir.display());
    Ok(())
}
