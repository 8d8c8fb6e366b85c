pub mod catalog;
pub mod domain;
pub mod error;
pub mod media;
pub mod paths;
pub mod sync;

use std::path::Path;

use serde_json::value::RawValue;
use tracing::info;

use catalog::{Catalog, WriteMode};
use domain::*;
use error::Result;
use sync::{CollectionLookup, DownloadProgress, Fetcher};

/// The main entry point for the igsync library: a catalog of saved posts plus
/// the operations that move it toward "everything named and downloaded".
pub struct Archive {
    catalog: Catalog,
}

impl Archive {
    /// Open or create an archive at the given catalog path.
    pub fn open(catalog_path: &Path) -> Result<Self> {
        let catalog = Catalog::open(catalog_path)?;
        Ok(Self { catalog })
    }

    /// Open an in-memory archive (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            catalog: Catalog::open_in_memory()?,
        })
    }

    /// Wrap an already-open catalog.
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Save one post record.
    pub fn import_post(&mut self, post: &PostRecord) -> Result<()> {
        self.catalog.save_post(post)
    }

    /// Save several post records atomically.
    pub fn import_posts(&mut self, posts: &[PostRecord]) -> Result<usize> {
        self.catalog.save_posts(posts)
    }

    /// Parse and save a JSON document holding either one post or an array of posts.
    /// Each post keeps its own source text. Returns the number of posts saved;
    /// nothing is saved if any post is malformed.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let posts = if json.trim_start().starts_with('[') {
            let items: Vec<Box<RawValue>> = serde_json::from_str(json)?;
            items
                .iter()
                .map(|raw| PostRecord::from_json(raw.get()))
                .collect::<Result<Vec<_>>>()?
        } else {
            vec![PostRecord::from_json(json)?]
        };
        let count = self.catalog.save_posts(&posts)?;
        info!(count, "imported posts");
        Ok(count)
    }

    /// List all collections with their names, if resolved.
    pub fn collections(&self) -> Result<Vec<Collection>> {
        self.catalog.all_collections()
    }

    pub fn pending_collection_names(&self) -> Result<Vec<String>> {
        self.catalog.pending_collection_names()
    }

    /// Set a collection's name by hand, creating the collection if needed.
    pub fn set_collection_name(&self, pk: &str, name: &str) -> Result<()> {
        self.catalog
            .save_collection(pk, Some(name), WriteMode::Overwrite)
    }

    /// Resolve every unnamed collection through `lookup`.
    pub fn sync_collection_names(&self, lookup: &dyn CollectionLookup) -> Result<usize> {
        sync::sync_collection_names(&self.catalog, lookup)
    }

    /// Media URLs that still need downloading.
    pub fn pending_downloads(&self) -> Result<Vec<PendingDownload>> {
        self.catalog.pending_media_downloads()
    }

    /// Download all pending media below `media_root`.
    /// Returns `(fetched, skipped)`.
    pub fn download_pending(
        &self,
        media_root: &Path,
        fetcher: &dyn Fetcher,
        progress_cb: Option<&mut dyn FnMut(DownloadProgress)>,
    ) -> Result<(usize, usize)> {
        sync::download_pending(&self.catalog, media_root, fetcher, progress_cb)
    }

    /// Get catalog summary statistics.
    pub fn status(&self) -> Result<CatalogStats> {
        self.catalog.stats_summary()
    }
}
