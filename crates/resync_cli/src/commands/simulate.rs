//! Simulate command implementation.

use resync_codec::Sitemap;
use resync_source::{tally, Source, SourceConfig, RESOURCELIST_FILE};
use std::fs;
use std::path::Path;

/// File name of the dynamic change list snapshot.
const CHANGELIST_FILE: &str = "changelist.xml";

/// Runs the simulator and writes its documents into `output`.
///
/// Static builders write their own files. Dynamic ones are snapshotted once
/// the simulation ends.
pub fn run(
    config_path: Option<&Path>,
    events: Option<usize>,
    output: &Path,
    max_entries: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => SourceConfig::load(path)?,
        None => SourceConfig::default(),
    }
    .with_static_dir(output);
    let events = events.unwrap_or(config.max_events);
    fs::create_dir_all(output)?;

    let source = Source::new(config)?;
    source.bootstrap();
    let changes = source.simulate(events);
    source.flush_static_changes()?;

    let sitemap = Sitemap::new().with_max_entries(max_entries);
    if source.write_static_resource_list()?.is_none() {
        sitemap.write(&source.resource_list(), &output.join(RESOURCELIST_FILE))?;
    }
    if let Some(memory) = source.change_memory() {
        sitemap.write_change_list(&memory.generate(None)?, &output.join(CHANGELIST_FILE))?;
    }

    let (created, updated, deleted) = tally(&changes);
    println!(
        "Simulated {events} changes (created={created}, updated={updated}, deleted={deleted}), {} resources",
        source.resource_count()
    );
    println!("Documents written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_codec::LocalFetcher;
    use tempfile::TempDir;

    #[test]
    fn writes_inventory_and_changes() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("source.json");
        fs::write(
            &config_path,
            r#"{"base_uri": "http://example.org/rs", "resource_count": 10, "seed": 3}"#,
        )
        .unwrap();
        let output = dir.path().join("out");

        run(Some(config_path.as_path()), Some(6), &output, 1000).unwrap();

        let sitemap = Sitemap::new();
        let inventory = sitemap
            .read(&LocalFetcher, output.join(RESOURCELIST_FILE).to_str().unwrap())
            .unwrap();
        assert!(!inventory.is_empty());
        let changes = sitemap
            .read_change_list(&LocalFetcher, output.join(CHANGELIST_FILE).to_str().unwrap())
            .unwrap();
        assert_eq!(changes.len(), 6);
    }
}
