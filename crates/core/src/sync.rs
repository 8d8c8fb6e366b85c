use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalog::{Catalog, WriteMode};
use crate::error::{BoxError, Error, Result};

/// Resolves a collection id to the name the user gave it.
pub trait CollectionLookup {
    fn collection_name(&self, collection_pk: &str) -> std::result::Result<String, BoxError>;
}

/// Fetches one media URL into a local file.
pub trait Fetcher {
    /// Write the body of `url` to `dest`. Parent directories already exist.
    fn fetch(&self, url: &str, dest: &Path) -> std::result::Result<(), BoxError>;
}

/// Progress callback events for a download run.
pub enum DownloadProgress {
    /// Starting with the number of pending media URLs.
    Start { total: usize },
    /// A file was fetched and recorded.
    Fetched { url: String, path: PathBuf },
    /// The file was already on disk; only the path was recorded.
    Skipped { path: PathBuf },
    /// No local path can be derived for this URL; it stays pending.
    Unplaceable { url: String, reason: String },
    /// Run finished.
    Complete {
        fetched: usize,
        skipped: usize,
        unplaceable: usize,
    },
}

/// Look up and store the name of every collection that has none yet.
/// Returns how many names were resolved.
pub fn sync_collection_names(catalog: &Catalog, lookup: &dyn CollectionLookup) -> Result<usize> {
    let pending = catalog.pending_collection_names()?;
    for pk in &pending {
        let name = lookup.collection_name(pk).map_err(Error::Collaborator)?;
        catalog.save_collection(pk, Some(&name), WriteMode::Overwrite)?;
        info!(collection = %pk, %name, "resolved collection name");
    }
    Ok(pending.len())
}

/// Fetch every pending media URL below `media_root` and record its relative path.
///
/// Rows whose path cannot be derived are logged and left pending. Any other
/// failure stops the run; downloads recorded before it stay recorded.
pub fn download_pending(
    catalog: &Catalog,
    media_root: &Path,
    fetcher: &dyn Fetcher,
    mut progress_cb: Option<&mut dyn FnMut(DownloadProgress)>,
) -> Result<(usize, usize)> {
    let pending = catalog.pending_media_downloads()?;

    if let Some(ref mut cb) = progress_cb {
        cb(DownloadProgress::Start {
            total: pending.len(),
        });
    }

    let mut fetched = 0usize;
    let mut skipped = 0usize;
    let mut unplaceable = 0usize;
    for item in &pending {
        let relative = match item.media_path() {
            Ok(relative) => relative,
            Err(e) => {
                warn!(post = %item.post_pk, url = %item.url, error = %e, "cannot place media; leaving it pending");
                unplaceable += 1;
                if let Some(ref mut cb) = progress_cb {
                    cb(DownloadProgress::Unplaceable {
                        url: item.url.clone(),
                        reason: e.to_string(),
                    });
                }
                continue;
            }
        };
        let target = media_root.join(&relative);

        let already_on_disk = target.is_file();
        if already_on_disk {
            warn!(path = %target.display(), "file already on disk but unrecorded; keeping it");
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fetcher
                .fetch(&item.url, &target)
                .map_err(Error::Collaborator)?;
        }

        catalog.record_download(&item.post_pk, &item.url, &relative.to_string_lossy())?;

        if already_on_disk {
            skipped += 1;
            if let Some(ref mut cb) = progress_cb {
                cb(DownloadProgress::Skipped { path: relative });
            }
        } else {
            fetched += 1;
            info!(post = %item.post_pk, path = %relative.display(), "downloaded media");
            if let Some(ref mut cb) = progress_cb {
                cb(DownloadProgress::Fetched {
                    url: item.url.clone(),
                    path: relative,
                });
            }
        }
    }

    if let Some(ref mut cb) = progress_cb {
        cb(DownloadProgress::Complete {
            fetched,
            skipped,
            unplaceable,
        });
    }

    Ok((fetched, skipped))
}
