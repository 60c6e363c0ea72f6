//! XML parsing of documents.
//!
//! The document is first read into a small namespace-resolved element tree,
//! then interpreted. Unknown elements and attributes are ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use resync_protocol::timestamp::parse_lastmod;
use resync_protocol::{Capabilities, Capability, ChangeKind, Resource};
use tracing::warn;

use crate::document::{Document, DocumentKind, Entry, RS_NS};
use crate::error::{CodecError, CodecResult};

#[derive(Debug, Default)]
struct Element {
    ns: Option<String>,
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn in_rs(&self) -> bool {
        self.ns.as_deref() == Some(RS_NS)
    }
}

fn start_element(ns: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Element, String> {
    let ns = match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    };
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        attrs.push((key, value.into_owned()));
    }

    Ok(Element {
        ns,
        name,
        attrs,
        ..Element::default()
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn parse_tree(text: &str) -> Result<Element, String> {
    let mut reader = NsReader::from_str(text);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_resolved_event().map_err(|e| e.to_string())? {
            (ns, Event::Start(start)) => stack.push(start_element(ns, &start)?),
            (ns, Event::Empty(start)) => {
                let element = start_element(ns, &start)?;
                attach(&mut stack, &mut root, element);
            }
            (_, Event::End(_)) => {
                let element = stack.pop().ok_or("unbalanced end tag")?;
                attach(&mut stack, &mut root, element);
            }
            (_, Event::Text(text)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            (_, Event::CData(data)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(format!("unclosed element <{}>", stack[stack.len() - 1].name));
    }
    root.ok_or_else(|| "no root element".to_string())
}

fn parse_entry(uri: &str, element: &Element) -> CodecResult<Entry> {
    let mut loc = None;
    let mut resource = Resource::new(String::new());
    let mut change_kind = None;
    let mut change_id = None;

    for child in &element.children {
        let value = child.text.trim();
        match (child.in_rs(), child.name.as_str()) {
            (false, "loc") => loc = Some(value.to_string()),
            (false, "lastmod") => {
                let ts = parse_lastmod(value).map_err(|e| CodecError::format(uri, e))?;
                resource.last_modified = Some(ts);
            }
            (true, "size") => {
                let size = value
                    .parse()
                    .map_err(|_| CodecError::format(uri, format!("bad rs:size {value:?}")))?;
                resource.size = Some(size);
            }
            (true, "md5") => resource.checksum = Some(value.to_string()),
            (true, "changetype") => {
                let kind: ChangeKind = value.parse().map_err(|e| CodecError::format(uri, e))?;
                change_kind = Some(kind);
            }
            (true, "changeid") => {
                let id = value
                    .parse()
                    .map_err(|_| CodecError::format(uri, format!("bad rs:changeid {value:?}")))?;
                change_id = Some(id);
            }
            _ => {}
        }
    }

    resource.uri = match loc {
        Some(loc) if !loc.is_empty() => loc,
        _ => return Err(CodecError::MissingLoc { uri: uri.to_string() }),
    };

    Ok(Entry {
        resource,
        change_kind,
        change_id,
    })
}

fn parse_link(uri: &str, element: &Element, capabilities: &mut Capabilities) {
    let Some(href) = element.attr("href") else {
        warn!(document = %uri, "ignoring link without href");
        return;
    };
    let mut capability = Capability::new(Capability::parse_rel(element.attr("rel").unwrap_or("")));
    if let Some(kind) = element.attr("type") {
        capability = capability.with_type(kind);
    }
    capabilities.insert(href, capability);
}

/// Parses document bytes read from `uri`.
pub fn parse_document(uri: &str, bytes: &[u8]) -> CodecResult<Document> {
    let text = std::str::from_utf8(bytes).map_err(|e| CodecError::format(uri, e))?;
    let root = parse_tree(text).map_err(|e| CodecError::format(uri, e))?;

    let (kind, entry_name) = match root.name.as_str() {
        "urlset" => (DocumentKind::UrlSet, "url"),
        "sitemapindex" => (DocumentKind::Index, "sitemap"),
        other => {
            return Err(CodecError::format(
                uri,
                format!("unexpected root element <{other}>"),
            ))
        }
    };

    let mut capabilities = Capabilities::new();
    let mut entries = Vec::new();
    for child in &root.children {
        if child.name == entry_name && !child.in_rs() {
            entries.push(parse_entry(uri, child)?);
        } else if child.name == "link" {
            parse_link(uri, child, &mut capabilities);
        }
    }

    Ok(Document {
        uri: uri.to_string(),
        kind,
        capabilities,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_protocol::rel;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
        xmlns:rs="http://www.openarchives.org/rs/terms/"
        xmlns:atom="http://www.w3.org/2005/Atom">
  <atom:link href="http://e.org/changelist.xml?from=1" rel="current" type="http://www.openarchives.org/rs/changelist"/>
  <url>
    <loc>http://e.org/a</loc>
    <lastmod>2013-01-02T03:04:05Z</lastmod>
    <rs:size>12</rs:size>
    <rs:md5>abc</rs:md5>
    <priority>0.5</priority>
  </url>
  <url><loc>http://e.org/b</loc><rs:changetype>DELETED</rs:changetype><rs:changeid>9</rs:changeid></url>
  <unknown>ignored</unknown>
</urlset>"#;

    #[test]
    fn parse_urlset() {
        let doc = parse_document("http://e.org/sitemap.xml", URLSET.as_bytes()).unwrap();

        assert_eq!(doc.kind, DocumentKind::UrlSet);
        assert_eq!(doc.entries.len(), 2);

        let a = &doc.entries[0];
        assert_eq!(a.resource.uri, "http://e.org/a");
        assert_eq!(a.resource.size, Some(12));
        assert_eq!(a.resource.checksum.as_deref(), Some("abc"));
        assert!(a.resource.last_modified.is_some());
        assert_eq!(a.change_kind, None);

        let b = &doc.entries[1];
        assert_eq!(b.change_kind, Some(ChangeKind::Deleted));
        assert_eq!(b.change_id, Some(9));

        assert_eq!(
            doc.capabilities.hrefs_with_rel(rel::CURRENT),
            vec!["http://e.org/changelist.xml?from=1"]
        );
    }

    #[test]
    fn parse_index() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <sitemap><loc>http://e.org/sitemap00000.xml</loc><lastmod>2013-01-02</lastmod></sitemap>
        </sitemapindex>"#;
        let doc = parse_document("http://e.org/sitemap.xml", xml.as_bytes()).unwrap();

        assert!(doc.is_index());
        assert_eq!(doc.entries[0].resource.uri, "http://e.org/sitemap00000.xml");
    }

    #[test]
    fn missing_loc() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><lastmod>2013</lastmod></url></urlset>"#;
        let err = parse_document("doc", xml.as_bytes()).unwrap_err();
        assert_eq!(err, CodecError::MissingLoc { uri: "doc".into() });
    }

    #[test]
    fn malformed_documents() {
        for xml in [
            "<urlset><url><loc>a</loc></urlset>",
            "<feed></feed>",
            "",
            r#"<urlset xmlns:rs="http://www.openarchives.org/rs/terms/"><url><loc>a</loc><rs:size>x</rs:size></url></urlset>"#,
        ] {
            let err = parse_document("doc", xml.as_bytes()).unwrap_err();
            assert!(matches!(err, CodecError::Format { .. }), "{xml}: {err:?}");
        }
    }
}
