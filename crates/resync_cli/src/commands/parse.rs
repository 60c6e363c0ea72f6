//! Parse command implementation.

use resync_client::TransportFetcher;
use resync_codec::{CodecError, Sitemap};
use resync_protocol::{Capabilities, ChangeRecord, Resource};
use std::time::Duration;

use super::http_transport;

/// Runs the parse command.
///
/// A document whose entries carry change types is printed as a change list,
/// anything else as an inventory. An index is followed unless
/// `allow_multifile` is off.
pub fn run(uri: &str, format: &str, allow_multifile: bool) -> Result<(), Box<dyn std::error::Error>> {
    let transport = http_transport(Duration::from_secs(30))?;
    let fetcher = TransportFetcher(&transport);
    let sitemap = Sitemap::new().with_multifile(allow_multifile);

    let root = sitemap.read_root(&fetcher, uri)?;
    if root.is_index() && !allow_multifile {
        return Err(CodecError::IndexDisabled { uri: uri.to_string() }.into());
    }
    let first = match (root.is_index(), root.entries.first()) {
        (true, Some(child)) => sitemap.read_root(&fetcher, &child.resource.uri)?.entries.into_iter().next(),
        (_, first) => first.cloned(),
    };
    let is_change_list = first.is_some_and(|e| e.change_kind.is_some());

    if is_change_list {
        let list = sitemap.read_change_list(&fetcher, uri)?;
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(list.changes())?),
            _ => {
                print_links(list.capabilities());
                for change in list.iter() {
                    println!("{}", change_line(change));
                }
                let (created, updated, deleted) = list.counts();
                println!(
                    "{} changes (created={created}, updated={updated}, deleted={deleted})",
                    list.len()
                );
            }
        }
    } else {
        let set = sitemap.read(&fetcher, uri)?;
        match format {
            "json" => {
                let resources: Vec<&Resource> = set.iter().collect();
                println!("{}", serde_json::to_string_pretty(&resources)?);
            }
            _ => {
                print_links(set.capabilities());
                for resource in set.iter() {
                    println!("{}", resource_line(resource));
                }
                println!("{} resources", set.len());
            }
        }
    }
    Ok(())
}

fn print_links(capabilities: &Capabilities) {
    for (href, capability) in capabilities.iter() {
        match &capability.kind {
            Some(kind) => println!("link rel=\"{}\" type=\"{kind}\" {href}", capability.rel_text()),
            None => println!("link rel=\"{}\" {href}", capability.rel_text()),
        }
    }
}

fn resource_line(resource: &Resource) -> String {
    let mut line = resource.uri.clone();
    if let Some(ts) = resource.last_modified {
        line.push_str(&format!(" lastmod={}", ts.to_rfc3339()));
    }
    if let Some(size) = resource.size {
        line.push_str(&format!(" size={size}"));
    }
    if let Some(md5) = &resource.checksum {
        line.push_str(&format!(" md5={md5}"));
    }
    line
}

fn change_line(change: &ChangeRecord) -> String {
    format!("[{}] {} {}", change.change_id, change.kind, resource_line(&change.resource))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_protocol::ChangeKind;
    use resync_testkit::fixtures::{resource, t0};

    #[test]
    fn lines() {
        let r = resource("a", 5, t0()).with_checksum("abc");
        assert_eq!(
            resource_line(&r),
            "http://example.org/rs/a lastmod=2013-01-02T03:04:05+00:00 size=5 md5=abc"
        );
        let change = ChangeRecord::new(resource("b", 1, t0()), ChangeKind::Deleted, 7);
        assert!(change_line(&change).starts_with("[7] DELETED http://example.org/rs/b"));
    }
}
