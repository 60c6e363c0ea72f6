//! XML serialization of documents.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use resync_protocol::timestamp::format_lastmod;
use resync_protocol::{Capabilities, ChangeRecord, Resource};
use std::io::Cursor;

use crate::document::{ATOM_NS, RS_NS, SITEMAP_NS};
use crate::error::{CodecError, CodecResult};

/// An entry to be written.
#[derive(Debug, Clone, Copy)]
pub enum WriteEntry<'a> {
    /// Plain inventory entry.
    Resource(&'a Resource),
    /// Change record, written with the change extension elements.
    Change(&'a ChangeRecord),
}

impl<'a> WriteEntry<'a> {
    fn resource(&self) -> &'a Resource {
        match *self {
            WriteEntry::Resource(r) => r,
            WriteEntry::Change(c) => &c.resource,
        }
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn new_writer(pretty: bool) -> XmlWriter {
    if pretty {
        Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2)
    } else {
        Writer::new(Cursor::new(Vec::new()))
    }
}

fn encode_err(err: quick_xml::Error) -> CodecError {
    CodecError::format("<output>", err)
}

fn root_start<'a>(name: &'a str, capabilities: &Capabilities) -> BytesStart<'a> {
    let mut root = BytesStart::new(name);
    root.push_attribute(("xmlns", SITEMAP_NS));
    root.push_attribute(("xmlns:rs", RS_NS));
    if !capabilities.is_empty() {
        root.push_attribute(("xmlns:atom", ATOM_NS));
    }
    root
}

fn write_links(writer: &mut XmlWriter, capabilities: &Capabilities) -> CodecResult<()> {
    for (href, capability) in capabilities.iter() {
        let mut link = BytesStart::new("atom:link");
        link.push_attribute(("href", href));
        let rel = capability.rel_text();
        if !rel.is_empty() {
            link.push_attribute(("rel", rel.as_str()));
        }
        if let Some(kind) = &capability.kind {
            link.push_attribute(("type", kind.as_str()));
        }
        writer.write_event(Event::Empty(link)).map_err(encode_err)?;
    }
    Ok(())
}

fn write_text_element(writer: &mut XmlWriter, name: &str, value: &str) -> CodecResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_err)?;
    Ok(())
}

fn write_entry(writer: &mut XmlWriter, element: &str, entry: WriteEntry<'_>) -> CodecResult<()> {
    let resource = entry.resource();
    writer
        .write_event(Event::Start(BytesStart::new(element)))
        .map_err(encode_err)?;

    write_text_element(writer, "loc", &resource.uri)?;
    if let Some(ts) = &resource.last_modified {
        write_text_element(writer, "lastmod", &format_lastmod(ts))?;
    }
    if let Some(size) = resource.size {
        write_text_element(writer, "rs:size", &size.to_string())?;
    }
    if let Some(checksum) = &resource.checksum {
        write_text_element(writer, "rs:md5", checksum)?;
    }
    if let WriteEntry::Change(change) = entry {
        write_text_element(writer, "rs:changetype", change.kind.as_str())?;
        write_text_element(writer, "rs:changeid", &change.change_id.to_string())?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element)))
        .map_err(encode_err)?;
    Ok(())
}

fn write_document<'a, I>(
    root: &str,
    element: &str,
    entries: I,
    capabilities: &Capabilities,
    pretty: bool,
) -> CodecResult<String>
where
    I: IntoIterator<Item = WriteEntry<'a>>,
{
    let mut writer = new_writer(pretty);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::Start(root_start(root, capabilities)))
        .map_err(encode_err)?;

    write_links(&mut writer, capabilities)?;
    for entry in entries {
        write_entry(&mut writer, element, entry)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(root)))
        .map_err(encode_err)?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| CodecError::format("<output>", e))
}

/// Serializes entries as a `<urlset>` document.
pub fn urlset_to_xml<'a, I>(entries: I, capabilities: &Capabilities, pretty: bool) -> CodecResult<String>
where
    I: IntoIterator<Item = WriteEntry<'a>>,
{
    write_document("urlset", "url", entries, capabilities, pretty)
}

/// Serializes child document references as a `<sitemapindex>` document.
pub fn index_to_xml(children: &[Resource], capabilities: &Capabilities, pretty: bool) -> CodecResult<String> {
    write_document(
        "sitemapindex",
        "sitemap",
        children.iter().map(WriteEntry::Resource),
        capabilities,
        pretty,
    )
}
