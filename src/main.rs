use std::sync::Arc;
use std::time::Duration;

use tokio::{signal, sync::mpsc};
use tracing::{error, info, warn};

use fulfillment_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db = Arc::new(db_pool);

    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    let services = api::handlers::AppServices::new(
        db.clone(),
        event_sender.clone(),
        Duration::from_secs(cfg.idempotency_ttl_secs),
    );

    // Expired idempotency keys are reusable; sweep them out periodically.
    {
        let idempotency = services.idempotency.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                if let Err(e) = idempotency.purge_expired().await {
                    warn!(error = %e, "Idempotency key sweep failed");
                }
            }
        });
    }

    let bind_addr = cfg.bind_addr();
    let state = api::AppState {
        db,
        config: cfg,
        event_sender,
        services,
    };

    let app = api::app(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to install shutdown handler: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
