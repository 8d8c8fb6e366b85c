use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use igsync_core::error::BoxError;
use igsync_core::sync::CollectionLookup;
use igsync_core::Archive;

/// Collection names read from a `{"<id>": "<name>"}` file.
pub(crate) struct NamesFile {
    names: HashMap<String, String>,
}

impl NamesFile {
    pub(crate) fn parse(json: &str) -> Result<Self> {
        let names: HashMap<String, String> =
            serde_json::from_str(json).context("names file must be a JSON object of strings")?;
        Ok(Self { names })
    }
}

impl CollectionLookup for NamesFile {
    fn collection_name(&self, collection_pk: &str) -> std::result::Result<String, BoxError> {
        self.names
            .get(collection_pk)
            .cloned()
            .ok_or_else(|| format!("no name given for collection {collection_pk}").into())
    }
}

pub fn list(archive: &Archive) -> Result<()> {
    let collections = archive.collections()?;
    if collections.is_empty() {
        println!("No collections yet. Import some posts with `igsync import`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("ID"), Cell::new("Name"), Cell::new("Posts")]);

    for collection in &collections {
        let members = archive.catalog().collection_members(&collection.pk)?.len();
        let name = match &collection.name {
            Some(name) => Cell::new(name),
            None => Cell::new("unnamed").fg(Color::DarkGrey),
        };
        table.add_row(vec![Cell::new(&collection.pk), name, Cell::new(members)]);
    }

    println!("{table}");
    Ok(())
}

pub fn name(archive: &Archive, pk: &str, name: &str) -> Result<()> {
    archive.set_collection_name(pk, name)?;
    println!("Collection {pk} named \"{name}\".");
    Ok(())
}

pub fn resolve(archive: &Archive, names_path: &Path) -> Result<()> {
    let json = fs::read_to_string(names_path)
        .with_context(|| format!("reading {}", names_path.display()))?;
    let lookup = NamesFile::parse(&json)?;
    let resolved = archive.sync_collection_names(&lookup)?;
    println!("Resolved {resolved} collection names.");
    Ok(())
}
