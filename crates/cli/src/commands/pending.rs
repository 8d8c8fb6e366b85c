use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use igsync_core::Archive;

pub fn run(archive: &Archive) -> Result<()> {
    let pending = archive.pending_downloads()?;
    if pending.is_empty() {
        println!("Nothing to download.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Post"),
        Cell::new("Code"),
        Cell::new("#"),
        Cell::new("Path"),
    ]);

    for item in &pending {
        let path = match item.media_path() {
            Ok(path) => Cell::new(path.display()),
            Err(e) => Cell::new(e).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(&item.post_pk),
            Cell::new(&item.code),
            Cell::new(item.index),
            path,
        ]);
    }

    println!("{table}");
    println!("  {} media files pending.", pending.len());
    Ok(())
}
