use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use igsync_core::Archive;

pub fn run(archive: &mut Archive, files: &[PathBuf]) -> Result<()> {
    let mut total = 0usize;
    for path in files {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let count = archive
            .import_json(&json)
            .with_context(|| format!("importing {}", path.display()))?;
        println!("{}: {} posts", path.display(), count);
        total += count;
    }

    let pending = archive.pending_downloads()?.len();
    println!("Imported {total} posts ({pending} media files pending download).");
    Ok(())
}
