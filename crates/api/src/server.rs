//! Process bootstrap: store, services, background workers and listeners.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use estate_auth::{Clock, PasswordHasher, SystemClock};
use estate_core::{Store, StoreError, UserStore};
use estate_infra::config::Config;
use estate_infra::store;
use estate_infra::workers::SessionSweeper;

use crate::app::{self, dispatch::Dispatcher, services::Services};
use crate::transport::{Endpoint, SocketListener};

/// Run until Ctrl-C, then stop listeners and workers.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = store::open(config.database.as_ref()).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hasher = PasswordHasher::new(config.hash_cost).context("invalid password hashing parameters")?;

    if let Some(login) = &config.bootstrap_admin {
        bootstrap_admin(store.as_ref(), login).await?;
    }

    let sweeper = config
        .sweep_interval
        .map(|every| SessionSweeper::spawn(Arc::clone(&store), Arc::clone(&clock), every));

    let dispatcher = Arc::new(Dispatcher::new(Services::new(store, hasher, clock)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    let mut endpoints = Vec::new();
    #[cfg(unix)]
    endpoints.push(Endpoint::Unix(config.socket_path.clone()));
    if let Some(addr) = config.tcp_addr {
        endpoints.push(Endpoint::Tcp(addr));
    }
    for endpoint in endpoints {
        let listener = SocketListener::bind(&endpoint)
            .await
            .with_context(|| format!("failed to bind {endpoint}"))?;
        tasks.spawn(listener.serve(
            Arc::clone(&dispatcher),
            config.max_request_bytes,
            shutdown_rx.clone(),
        ));
    }

    let http = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    info!(addr = %config.http_addr, "http listening");
    let mut http_shutdown = shutdown_rx.clone();
    let router = app::build_app(Arc::clone(&dispatcher));
    tasks.spawn(async move {
        let serve = axum::serve(http, router).with_graceful_shutdown(async move {
            let _ = http_shutdown.wait_for(|stop| *stop).await;
        });
        if let Err(err) = serve.await {
            warn!(error = %err, "http server stopped with error");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown requested");

    let _ = shutdown_tx.send(true);
    while tasks.join_next().await.is_some() {}
    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    Ok(())
}

/// Grant the group-management capability to an existing user.
///
/// The first capability holder cannot be created through the protocol, since
/// granting requires the capability itself.
pub async fn bootstrap_admin(store: &dyn Store, login: &str) -> anyhow::Result<()> {
    match store.user_by_login(login).await {
        Ok(user) => {
            store
                .set_manages_groups(user.id, true)
                .await
                .context("failed to grant group management")?;
            info!(user_id = %user.id, "bootstrap admin granted group management");
            Ok(())
        }
        Err(StoreError::NotFound(_)) => {
            warn!(login, "bootstrap admin does not exist yet; skipping");
            Ok(())
        }
        Err(err) => Err(err).context("failed to look up bootstrap admin"),
    }
}
