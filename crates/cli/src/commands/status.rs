use std::path::Path;

use anyhow::Result;
use igsync_core::domain::CatalogStats;
use igsync_core::Archive;

/// Share of media URLs already downloaded, as a whole percentage.
pub(crate) fn download_percent(stats: &CatalogStats) -> u64 {
    if stats.total_urls == 0 {
        return 100;
    }
    (stats.downloaded_urls as u64 * 100) / stats.total_urls as u64
}

pub fn run(archive: &Archive, catalog_path: &Path, media_dir: &Path) -> Result<()> {
    let stats = archive.status()?;

    println!();
    println!("  igsync Status");
    println!("  =============");
    println!();
    println!("   Catalog:     {}", catalog_path.display());
    println!("   Media:       {}", media_dir.display());
    println!();
    println!(
        "   Posts:       {:>8}        Users:       {:>8}",
        stats.total_posts, stats.total_users
    );
    println!(
        "   Collections: {:>8}        Unnamed:     {:>8}",
        stats.total_collections, stats.unnamed_collections
    );
    println!(
        "   Media URLs:  {:>8}        Downloaded:  {:>8} ({}%)",
        stats.total_urls,
        stats.downloaded_urls,
        download_percent(&stats)
    );
    println!();

    if stats.unnamed_collections > 0 {
        println!("  Run 'igsync collections resolve <names.json>' to name collections.");
    }
    if stats.downloaded_urls < stats.total_urls {
        println!("  Run 'igsync download' to fetch pending media.");
    }
    Ok(())
}
