use crate::app::get_app;
use crate::backend::CredentialsBackend;
use crate::server::ProxyServer;
use crate::state::ProxyState;
use anyhow::Result;
use mesos2iam_common::config::Config;
use mesos2iam_identity::{
    port_owner_lookup, ContainerInventory, DockerRuntime, IdentityResolver, SysinfoProcessTree,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
pub async fn run(config: Config) -> Result<()> {
    let inventory = ContainerInventory::new(Arc::new(DockerRuntime::connect()?));

    let resolver = IdentityResolver::builder()
        .host_ip(config.host_ip)
        .job_id_prefix(&config.job_id_prefix)
        .port_owners(port_owner_lookup(&config))
        .processes(Arc::new(SysinfoProcessTree::new()))
        .inventory(inventory)
        .build();

    let backend = CredentialsBackend::new(&config.credentials_url, config.backend_timeout())?;
    let app = get_app(ProxyState::new(resolver, backend));

    let server = ProxyServer::bind(config.listen_addr(), app).await?;
    info!(
        "Forwarding credential requests for host {} to {}",
        config.host_ip, config.credentials_url
    );

    let cancellation_token = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancellation_token.clone()));

    server.run(cancellation_token).await
}

async fn cancel_on_shutdown_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Can't listen for SIGTERM: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    let _ = ctrl_c.await;

    info!("Shutdown signal received");
    token.cancel();
}
