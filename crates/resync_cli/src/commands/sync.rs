//! Audit, baseline sync and incremental sync.

use resync_client::{
    ClientConfig, ClientSyncEngine, HttpTransport, ReqwestClient, SyncResult, TransferFailure,
};

use super::http_transport;

type Engine = ClientSyncEngine<HttpTransport<ReqwestClient>>;

fn engine(config: ClientConfig) -> SyncResult<Engine> {
    let transport = http_transport(config.timeout)?;
    ClientSyncEngine::new(config, transport)
}

/// Runs the audit command.
pub fn audit(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let report = engine(config)?.audit()?;
    println!("{}", report.status_line());
    Ok(())
}

/// Runs the sync command.
pub fn sync(config: ClientConfig, delete: bool) -> Result<(), Box<dyn std::error::Error>> {
    let report = engine(config)?.sync(delete)?;
    print_failures(&report.failures);
    if report.deletions_skipped > 0 {
        println!(
            "{} local files not deleted (use --delete to remove them)",
            report.deletions_skipped
        );
    }
    println!("{}", report.status_line());
    Ok(())
}

/// Runs the incremental command.
pub fn incremental(
    config: ClientConfig,
    changelist: Option<&str>,
    delete: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = engine(config)?.incremental_sync(delete, changelist)?;
    print_failures(&report.failures);
    println!("{}", report.status_line());
    if let Some(next) = &report.next {
        println!("Next: {next}");
    }
    Ok(())
}

fn print_failures(failures: &[TransferFailure]) {
    for failure in failures {
        println!("FAILED {}: {}", failure.uri, failure.message);
    }
}
