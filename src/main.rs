use carelog::api::{serve, ApiContext};
use carelog::config::AppConfig;
use carelog::db::Db;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carelog=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(db = %config.db_path.display(), addr = %config.bind_addr, "starting");

    let db = match Db::open(&config.db_path) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Cannot open database: {e}");
            std::process::exit(1);
        }
    };

    let bind_addr = config.bind_addr;
    let ctx = ApiContext::new(db, config);
    let mut server = match serve(ctx, bind_addr).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Cannot bind {bind_addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Signal handler error: {e}");
    }
    tracing::info!("shutting down");
    server.shutdown();
}
