//! Authority of a document over the resources it lists.

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Master {
    Url {
        scheme: String,
        host: Option<String>,
        port: Option<u16>,
        dir: String,
    },
    Local {
        dir: String,
    },
}

/// Decides whether a document may describe a resource.
///
/// A document at `scheme://host:port/dir/name` has authority over URIs with
/// the same scheme, host and effective port whose path starts with `/dir/`.
/// A document read from a local path only has authority over URIs below its
/// own directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlAuthority {
    document: String,
    master: Master,
}

impl UrlAuthority {
    /// Creates the authority of the document at `document_uri`.
    pub fn new(document_uri: impl Into<String>) -> Self {
        let document = document_uri.into();
        let master = match Url::parse(&document) {
            Ok(url) if url.has_host() || url.scheme() == "file" => Master::Url {
                scheme: url.scheme().to_string(),
                host: url.host_str().map(str::to_string),
                port: url.port_or_known_default(),
                dir: directory_of(url.path()).to_string(),
            },
            _ => Master::Local {
                dir: directory_of(&document).to_string(),
            },
        };
        Self { document, master }
    }

    /// Returns the document URI this authority was built from.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Returns true if the document may describe `uri`.
    pub fn has_authority_over(&self, uri: &str) -> bool {
        match &self.master {
            Master::Url {
                scheme,
                host,
                port,
                dir,
            } => match Url::parse(uri) {
                Ok(url) => {
                    url.scheme() == scheme
                        && url.host_str() == host.as_deref()
                        && url.port_or_known_default() == *port
                        && url.path().starts_with(dir.as_str())
                }
                Err(_) => false,
            },
            Master::Local { dir } => uri.starts_with(dir.as_str()),
        }
    }
}

/// Returns the path up to and including its last `/`.
fn directory_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}
