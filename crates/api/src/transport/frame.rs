//! Bounded line framing and the per-connection request loop.

use std::io;
use std::sync::Arc;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::warn;

use super::{FrameError, TRANSPORT_TARGET};
use crate::app::dispatch::Dispatcher;
use crate::protocol::{Response, Status};

/// Read one line of at most `limit` bytes, newline excluded.
///
/// `Ok(None)` means the peer closed the connection between frames. A final
/// line without a trailing newline is still returned as a frame.
pub async fn read_frame<R>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let read = (&mut *reader).take(cap).read_until(b'\n', &mut buf).await?;
    if read == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > limit {
        return Err(FrameError::TooLarge { limit });
    }
    Ok(Some(buf))
}

/// Serve requests on one connection until the peer closes it.
///
/// An oversized frame cannot be resynchronised, so it is answered with 253
/// and the connection is closed.
pub async fn serve_connection<S>(stream: S, dispatcher: Arc<Dispatcher>, limit: usize) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read, mut write) = tokio::io::split(stream);
    let mut reader = BufReader::new(read);

    loop {
        match read_frame(&mut reader, limit).await {
            Ok(None) => return Ok(()),
            Ok(Some(frame)) if frame.iter().all(u8::is_ascii_whitespace) => continue,
            Ok(Some(frame)) => {
                let response = dispatcher.dispatch_frame(&frame).await;
                write.write_all(&response.to_frame()).await?;
                write.flush().await?;
            }
            Err(FrameError::TooLarge { limit }) => {
                warn!(target: TRANSPORT_TARGET, limit, "oversized request; closing connection");
                write
                    .write_all(&Response::status(Status::InvalidArguments).to_frame())
                    .await?;
                write.flush().await?;
                return Ok(());
            }
            Err(FrameError::Io(err)) => return Err(err),
        }
    }
}
