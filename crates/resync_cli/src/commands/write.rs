//! Write command implementation.

use resync_client::{ClientConfig, ResourceListBuilder};
use std::path::Path;
use tracing::info;

/// Builds a resource list from the mapped directories and writes it.
///
/// Without an output file the document is printed. The output file itself
/// is never listed.
pub fn run(config: &ClientConfig, outfile: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    if config.mappings.is_empty() {
        return Err("at least one --mapping is required for write".into());
    }
    let mut builder = ResourceListBuilder::new(config.mappings.clone())
        .with_checksum(config.checksum)
        .with_exclude_dirs(config.exclude_dirs.clone());
    if let Some(name) = outfile.and_then(|p| p.file_name()) {
        builder = builder.exclude_file(name.to_string_lossy());
    }
    let set = builder.build()?;

    let sitemap = config.sitemap();
    match outfile {
        Some(path) => {
            let written = sitemap.write(&set, path)?;
            info!(resources = set.len(), documents = written.documents.len(), "resource list written");
            println!("Wrote {} resources to {}", set.len(), path.display());
        }
        None => println!("{}", sitemap.resources_as_xml(&set)?),
    }
    Ok(())
}
