//! `ticketd`: priority ticket dispatch server.
//!
//! ```text
//! ticketd [-H host] [-p port] [-f snapshot] [-s sync-secs] [-v...]
//! ```

use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use ticketkit::config::ServerConfig;
use ticketkit::error::ServerError;
use ticketkit::server;
use ticketkit::shared::SharedQueue;
use ticketkit::snapshot::load_snapshot;
use ticketkit::syncer::Syncer;

fn main() -> ExitCode {
    let config = ServerConfig::parse();
    config.configure_logging();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "ticketd stopped");
            ExitCode::FAILURE
        },
    }
}

fn run(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    let addr = config.bind_addr()?;

    let queue = SharedQueue::new();
    let report = queue.with_locked(|q| load_snapshot(q, &config.file))?;
    info!(
        path = %config.file.display(),
        loaded = report.loaded,
        skipped = report.skipped,
        "snapshot restored"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let syncer = Syncer::spawn(queue.clone(), config.file.clone(), config.sync_interval())?;

    let served = runtime.block_on(async {
        let listener = TcpListener::bind(addr).await?;
        server::serve(listener, queue, server::shutdown_signal()).await
    });

    let written = syncer.shutdown()?;
    info!(items = written, "final snapshot written");
    served
}
