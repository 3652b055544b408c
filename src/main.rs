use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eduadmin::api::router;
use eduadmin::config::{AppConfig, StoreBackend};
use eduadmin::db;
use eduadmin::error::AppError;
use eduadmin::state::AppState;
use eduadmin::store::Stores;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "eduadmin=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;

    let (stores, pool) = match config.backend {
        StoreBackend::Sqlite => {
            let pool = db::connect(&config.database_url).await?;
            info!("using sqlite store at {}", config.database_url);
            (Stores::sqlite(pool.clone()), Some(pool))
        }
        StoreBackend::Rest => {
            let rest = config
                .rest
                .clone()
                .ok_or_else(|| AppError::Config("REST backend selected without settings".to_string()))?;
            info!("using REST store at {}", rest.base_url);
            (Stores::rest(rest)?, None)
        }
    };

    let addr = config.bind_addr;
    let state = AppState {
        stores,
        config: Arc::new(config),
        db: pool,
    };

    let app = router(state);

    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
