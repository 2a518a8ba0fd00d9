//! HTTP server lifecycle — bind → spawn background task → return a
//! handle with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

/// Bind and serve the API in a background tokio task.
///
/// Returns once the listener is bound, with the resolved address (port
/// 0 in the config picks an ephemeral port — used by tests).
pub async fn serve(ctx: ApiContext, bind_addr: SocketAddr) -> Result<ApiServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let app = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::Db;

    fn test_ctx(dir: &tempfile::TempDir) -> ApiContext {
        let db_path = dir.path().join("server-test.db");
        let db = Db::open(&db_path).unwrap();
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            db_path,
            token_secret: "server-test-secret".into(),
            token_ttl_secs: 3600,
        };
        ApiContext::new(db, config)
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(&dir);
        let mut server = serve(ctx, "127.0.0.1:0".parse().unwrap())
            .await
            .expect("server should start");
        assert!(server.addr.port() > 0);

        // Open endpoint answers over real HTTP
        let url = format!("http://{}/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        // Protected endpoint rejects without a credential
        let url = format!("http://{}/patients", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        server.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(&dir);
        let mut server = serve(ctx, "127.0.0.1:0".parse().unwrap())
            .await
            .expect("server should start");

        server.shutdown();
        server.shutdown(); // Second call should be safe
    }
}
