use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::info;

use lw_gateway::app;

use lw_core::config::{default_config_path, LeadWatchConfig, DEFAULT_RELOAD_INTERVAL_SECS};
use lw_egress::Egress;
use lw_history::HistoryExtractor;
use lw_monitor::{CacheClearer, MonitorEngine};
use lw_payments::PaymentBridge;
use lw_platform::PlatformSessionFactory;
use lw_processor::MessageProcessor;
use lw_sessions::{PoolKind, SessionPool};
use lw_store::Store;
use lw_tariff::TariffChecker;
use lw_telegram::{TelegramEgress, TelegramSessionFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lw_gateway=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("LEADWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let config = LeadWatchConfig::load(&config_path)?;

    let store = Arc::new(Store::open(Path::new(&config.database.path))?);

    let egress: Arc<dyn Egress> = Arc::new(TelegramEgress::new(
        (!config.parameters.bot_token.is_empty()).then(|| config.parameters.bot_token.clone()),
    ));

    let realtime_factory: Arc<dyn PlatformSessionFactory> = Arc::new(TelegramSessionFactory::new());
    let realtime_pool = Arc::new(SessionPool::new(
        PoolKind::Realtime,
        PathBuf::from(&config.sessions.realtime_dir),
        realtime_factory,
    ));
    realtime_pool.refresh_credentials()?;

    let history_factory: Arc<dyn PlatformSessionFactory> = Arc::new(TelegramSessionFactory::new());
    let history_pool = Arc::new(SessionPool::new(
        PoolKind::History,
        PathBuf::from(&config.sessions.history_dir),
        history_factory,
    ));
    history_pool.refresh_credentials()?;

    // C3 forwards matched events to C4 over a channel rather than awaiting
    // processing inline; C4 asks C3 to stop a chat the same way.
    let (events_tx, events_rx) = mpsc::channel(1024);
    let (stop_chat_tx, mut stop_chat_rx) = mpsc::channel(256);

    let processor = MessageProcessor::new(
        store.clone(),
        egress.clone(),
        config.parameters.support_link.clone(),
        stop_chat_tx,
    );
    processor.spawn_consumer(events_rx);

    let cache_clearer: Arc<dyn CacheClearer> = processor.clone();
    let monitor = MonitorEngine::new(
        store.clone(),
        realtime_pool.clone(),
        events_tx,
        Some(cache_clearer),
        Duration::from_secs(DEFAULT_RELOAD_INTERVAL_SECS),
    );
    monitor.restart_all_active().await;
    monitor.spawn_maintenance();

    {
        let monitor = monitor.clone();
        tokio::spawn(async move {
            while let Some(chat_id) = stop_chat_rx.recv().await {
                monitor.stop_chat(chat_id).await;
            }
        });
    }

    let tariff_checker = TariffChecker::new(store.clone(), egress.clone());
    let (tariff_stop_tx, tariff_stop_rx) = watch::channel(false);
    {
        let checker = tariff_checker.clone();
        tokio::spawn(async move { checker.run(tariff_stop_rx).await });
    }

    let history_extractor = HistoryExtractor::new(history_pool.clone());

    let payment_bridge = PaymentBridge::new(
        store.clone(),
        egress.clone(),
        config.parameters.shop_id.clone(),
        config.parameters.secret_word_2.clone(),
    );

    let state = Arc::new(app::AppState {
        store: store.clone(),
        tariff_checker,
        payment_bridge,
        history_extractor,
        monitor: monitor.clone(),
        support_link: config.parameters.support_link.clone(),
    });

    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!(%addr, "leadwatch gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown signal received, draining");
    let _ = tariff_stop_tx.send(true);
    monitor.shutdown().await;
    history_pool.shutdown().await;
    info!("leadwatch gateway shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
