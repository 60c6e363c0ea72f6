//! CLI command implementations.

pub mod changelist;
pub mod parse;
pub mod simulate;
pub mod sync;
pub mod write;

use resync_client::{HttpTransport, ReqwestClient, SyncResult};
use std::time::Duration;

/// Transport for commands that read documents outside a sync.
pub(crate) fn http_transport(timeout: Duration) -> SyncResult<HttpTransport<ReqwestClient>> {
    Ok(HttpTransport::new(ReqwestClient::new(timeout)?))
}
