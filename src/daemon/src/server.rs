use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct ProxyServer {
    listener: TcpListener,
    app: Router,
}

impl ProxyServer {
    pub async fn bind(addr: SocketAddr, app: Router) -> anyhow::Result<Self> {
        match TcpListener::bind(addr).await {
            Ok(listener) => Ok(Self { listener, app }),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                anyhow::bail!(
                    "Failed to start mesos2iam: port {} is already in use. Stop the process holding it or pass another --app-port.",
                    addr.port()
                );
            }
            Err(e) => anyhow::bail!("Failed to bind to address {}: {}", addr, e),
        }
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until the token is cancelled. In-flight requests are allowed
    /// to finish.
    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        info!("Listening on {}", self.local_addr()?);

        axum::serve(
            self.listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await?;

        info!("Server stopped");
        Ok(())
    }
}
