use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Delay before accepting again after an accept error.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Write every line read from `stream` back to it until EOF.
///
/// Returns the number of lines echoed. A trailing line without a newline
/// is echoed as-is.
pub async fn echo<S>(stream: S) -> io::Result<usize>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    let mut lines = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(lines);
        }
        let stream = reader.get_mut();
        stream.write_all(&line).await?;
        stream.flush().await?;
        lines += 1;
    }
}

/// Accept connections on `listener`, one task each, until `cancel` fires.
///
/// Open connections are aborted on shutdown.
///
/// # Errors
/// Returns an error only if the listener address cannot be read.
pub async fn serve(listener: TcpListener, cancel: CancellationToken) -> io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Echo server listening");

    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            accepted = listener.accept() => {
                if let Some((stream, peer)) = accepted_or_backoff(accepted, addr).await {
                    tracing::debug!(%peer, "Connection accepted");
                    connections.spawn(async move {
                        match echo(stream).await {
                            Ok(lines) => tracing::debug!(%peer, lines, "Connection closed"),
                            Err(e) => tracing::warn!(%peer, error = %e, "Connection failed"),
                        }
                    });
                }
            }
        }
    }

    tracing::info!(%addr, open = connections.len(), "Echo server stopping");
    connections.shutdown().await;
    Ok(())
}

/// The accepted connection, or `None` after logging the error and waiting
/// [`ACCEPT_BACKOFF`].
async fn accepted_or_backoff<T>(accepted: io::Result<T>, addr: SocketAddr) -> Option<T> {
    match accepted {
        Ok(conn) => Some(conn),
        Err(e) => {
            tracing::warn!(%addr, error = %e, "Accept failed");
            tokio::time::sleep(ACCEPT_BACKOFF).await;
            None
        }
    }
}
