//! Changelist command implementation.

use resync_client::{ClientConfig, TransportFetcher};
use resync_protocol::compare;
use std::path::Path;
use tracing::info;

use super::http_transport;

/// Writes the changes that turn `reference` into `new_reference`.
pub fn run(
    config: &ClientConfig,
    reference: &str,
    new_reference: &str,
    outfile: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = http_transport(config.timeout)?;
    let fetcher = TransportFetcher(&transport);
    let sitemap = config.sitemap();

    let old = sitemap.read(&fetcher, reference)?;
    let new = sitemap.read(&fetcher, new_reference)?;
    let diff = compare(&old, &new);
    info!(
        same = diff.same,
        updated = diff.updated.len(),
        deleted = diff.deleted.len(),
        created = diff.created.len(),
        "compared inventories"
    );
    let list = diff.into_change_list(1);

    match outfile {
        Some(path) => {
            sitemap.write_change_list(&list, path)?;
            println!("Wrote {} changes to {}", list.len(), path.display());
        }
        None => println!("{}", sitemap.changes_as_xml(&list)?),
    }
    Ok(())
}
