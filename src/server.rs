//! TCP front end for the line protocol.
//!
//! One task per connection on the caller's runtime. Each request line is
//! parsed, executed against the [`SharedQueue`] (one lock acquisition), and
//! answered before the next line is read, so replies on a connection are in
//! request order.
//!
//! A request longer than [`MAX_LINE_LEN`] bytes is answered with the generic
//! error and the connection is closed; nothing past the limit is buffered.

use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, trace, warn};

use crate::error::ServerError;
use crate::protocol::{self, Command, ERR_GENERIC, Reply};
use crate::shared::SharedQueue;

/// Longest accepted request line, terminator included.
pub const MAX_LINE_LEN: usize = 8192;

/// Accepts connections until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    queue: SharedQueue,
    shutdown: impl Future<Output = ()>,
) -> Result<(), ServerError> {
    let local = listener.local_addr()?;
    info!(addr = %local, "listening");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested, no longer accepting");
                return Ok(());
            },
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let queue = queue.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(stream, peer, queue).await {
                            warn!(%peer, error = %err, "connection error");
                        }
                    });
                },
                Err(err) => warn!(error = %err, "accept failed"),
            },
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    queue: SharedQueue,
) -> std::io::Result<()> {
    debug!(%peer, "connected");
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = Vec::with_capacity(64);
    let mut out = Vec::with_capacity(64);

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            break;
        }
        if line.len() >= MAX_LINE_LEN && line.last() != Some(&b'\n') {
            warn!(%peer, limit = MAX_LINE_LEN, "request line too long, closing");
            out.clear();
            Reply::Error(ERR_GENERIC).write_to(&mut out);
            write_half.write_all(&out).await?;
            break;
        }

        let text = String::from_utf8_lossy(&line);
        trace!(%peer, request = %text.trim_end(), "request");
        let (reply, quit) = match protocol::parse(&text) {
            Ok(command) => (protocol::execute(&queue, command), command == Command::Quit),
            Err(err) => (Reply::from(err), false),
        };

        out.clear();
        reply.write_to(&mut out);
        write_half.write_all(&out).await?;
        if quit {
            break;
        }
    }

    debug!(%peer, "disconnected");
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("interrupt received"),
        () = terminate => info!("terminate received"),
    }
}
