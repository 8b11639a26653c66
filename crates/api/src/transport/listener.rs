//! Accept loops for the TCP and Unix socket endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{ListenerError, TRANSPORT_TARGET, serve_connection};
use crate::app::dispatch::Dispatcher;

#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::net::UnixListener;

/// Where a listener accepts connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(SocketAddr),
    #[cfg(unix)]
    Unix(PathBuf),
}

impl core::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

/// A bound listener, ready to serve.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: Endpoint,
    listener: ListenerKind,
}

impl SocketListener {
    pub async fn bind(endpoint: &Endpoint) -> Result<Self, ListenerError> {
        let listener = match endpoint {
            Endpoint::Tcp(addr) => {
                let tcp = TcpListener::bind(addr)
                    .await
                    .map_err(|source| ListenerError::BindTcp { addr: *addr, source })?;
                ListenerKind::Tcp(tcp)
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => ListenerKind::Unix(bind_unix(path)?),
        };

        let endpoint = match (&listener, endpoint) {
            // Report the actual port when bound to port 0.
            (ListenerKind::Tcp(tcp), Endpoint::Tcp(addr)) => {
                Endpoint::Tcp(tcp.local_addr().unwrap_or(*addr))
            }
            _ => endpoint.clone(),
        };
        Ok(Self { endpoint, listener })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Accept connections until `shutdown` flips to `true` or its sender is dropped.
    pub async fn serve(
        self,
        dispatcher: Arc<Dispatcher>,
        max_request_bytes: usize,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(target: TRANSPORT_TARGET, endpoint = %self.endpoint, "socket listener active");

        loop {
            tokio::select! {
                accepted = self.accept(Arc::clone(&dispatcher), max_request_bytes) => {
                    if let Err(err) = accepted {
                        warn!(target: TRANSPORT_TARGET, error = %err, "socket accept error");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        #[cfg(unix)]
        if let Endpoint::Unix(path) = &self.endpoint {
            if let Err(err) = std::fs::remove_file(path) {
                debug!(target: TRANSPORT_TARGET, error = %err, "socket file already gone");
            }
        }
        info!(target: TRANSPORT_TARGET, endpoint = %self.endpoint, "socket listener stopped");
    }

    /// Accept one connection and hand it to its own task.
    async fn accept(&self, dispatcher: Arc<Dispatcher>, limit: usize) -> std::io::Result<()> {
        match &self.listener {
            ListenerKind::Tcp(tcp) => {
                let (stream, peer) = tcp.accept().await?;
                debug!(target: TRANSPORT_TARGET, %peer, "connection accepted");
                tokio::spawn(async move {
                    if let Err(err) = serve_connection(stream, dispatcher, limit).await {
                        debug!(target: TRANSPORT_TARGET, error = %err, "connection closed with error");
                    }
                });
            }
            #[cfg(unix)]
            ListenerKind::Unix(unix) => {
                let (stream, _) = unix.accept().await?;
                tokio::spawn(async move {
                    if let Err(err) = serve_connection(stream, dispatcher, limit).await {
                        debug!(target: TRANSPORT_TARGET, error = %err, "connection closed with error");
                    }
                });
            }
        }
        Ok(())
    }
}

/// Bind a Unix socket, replacing a stale socket file left by a dead process.
#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    let display = path.display().to_string();
    if let Ok(meta) = std::fs::symlink_metadata(path) {
        if !meta.file_type().is_socket() {
            return Err(ListenerError::UnixNotSocket { path: display });
        }
        if std::os::unix::net::UnixStream::connect(path).is_ok() {
            return Err(ListenerError::UnixInUse { path: display });
        }
        std::fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
            path: display.clone(),
            source,
        })?;
    }
    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix { path: display, source })
}
