use std::sync::Arc;

use async_trait::async_trait;
use lw_core::types::UserId;
use lw_egress::{Egress, Markup};
use lw_history::HistoryExtractor;
use lw_monitor::MonitorEngine;
use lw_payments::PaymentBridge;
use lw_platform::PlatformSessionFactory;
use lw_sessions::{PoolKind, SessionPool};
use lw_store::Store;
use lw_tariff::TariffChecker;
use tokio::sync::mpsc;

struct NullEgress;

#[async_trait]
impl Egress for NullEgress {
    async fn send(&self, _user_id: UserId, _body: &str, _markup: Option<Markup>) -> lw_egress::Result<()> {
        Ok(())
    }

    async fn send_document(
        &self,
        _user_id: UserId,
        _filename: &str,
        _bytes: Vec<u8>,
        _caption: Option<&str>,
    ) -> lw_egress::Result<()> {
        Ok(())
    }
}

struct NullSessionFactory;

#[async_trait]
impl PlatformSessionFactory for NullSessionFactory {
    async fn connect(
        &self,
        _credential: &lw_platform::Credential,
    ) -> lw_platform::Result<Box<dyn lw_platform::PlatformSession>> {
        Err(lw_platform::PlatformError::NoSessionAvailable)
    }
}

async fn spawn_server() -> (String, Arc<Store>) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let egress: Arc<dyn Egress> = Arc::new(NullEgress);

    let factory: Arc<dyn PlatformSessionFactory> = Arc::new(NullSessionFactory);
    let realtime_dir = tempfile::tempdir().unwrap();
    let realtime_pool = Arc::new(SessionPool::new(PoolKind::Realtime, realtime_dir.path().to_path_buf(), factory.clone()));

    let history_dir = tempfile::tempdir().unwrap();
    let history_pool = Arc::new(SessionPool::new(PoolKind::History, history_dir.path().to_path_buf(), factory));

    let (events_tx, events_rx) = mpsc::channel(16);
    let (stop_chat_tx, _stop_chat_rx) = mpsc::channel(16);

    let processor = lw_processor::MessageProcessor::new(store.clone(), egress.clone(), "https://t.me/support".into(), stop_chat_tx);
    processor.spawn_consumer(events_rx);

    let cache_clearer: Arc<dyn lw_monitor::CacheClearer> = processor.clone();
    let monitor = MonitorEngine::new(
        store.clone(),
        realtime_pool,
        events_tx,
        Some(cache_clearer),
        std::time::Duration::from_secs(3600),
    );

    let tariff_checker = TariffChecker::new(store.clone(), egress.clone());
    let history_extractor = HistoryExtractor::new(history_pool);

    let payment_bridge = PaymentBridge::new(store.clone(), egress.clone(), "shop1".to_string(), "secret2".to_string());

    let state = Arc::new(lw_gateway::app::AppState {
        store: store.clone(),
        tariff_checker,
        payment_bridge,
        history_extractor,
        monitor,
        support_link: "https://t.me/support".into(),
    });

    let router = lw_gateway::app::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}"), store)
}

#[tokio::test]
async fn valid_webhook_credits_balance_and_returns_yes() {
    let (base_url, store) = spawn_server().await;
    store.get_or_create_user(UserId(7), None, None, None).unwrap();

    let amount = "150.00";
    let order_id = "7_1700000000";
    let sign = lw_payments::signature::webhook_signature("shop1", amount, "secret2", order_id);

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/tracking/payment/notification"))
        .form(&[("AMOUNT", amount), ("MERCHANT_ORDER_ID", order_id), ("SIGN", &sign), ("MERCHANT_ID", "shop1")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "YES");
    assert_eq!(store.get_user(UserId(7)).unwrap().unwrap().balance, 15000);
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let (base_url, store) = spawn_server().await;
    store.get_or_create_user(UserId(8), None, None, None).unwrap();

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/tracking/payment/notification"))
        .form(&[("AMOUNT", "150.00"), ("MERCHANT_ORDER_ID", "8_1700000000"), ("SIGN", "not-a-real-signature")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(store.get_user(UserId(8)).unwrap().unwrap().balance, 0);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (base_url, _store) = spawn_server().await;

    let resp = reqwest::get(format!("{base_url}/health")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn admin_projects_endpoint_lists_created_projects() {
    let (base_url, store) = spawn_server().await;
    let user = store.get_or_create_user(UserId(9), None, None, None).unwrap();
    store.create_project(user.id, "My Shop", None).unwrap();

    let resp = reqwest::get(format!("{base_url}/admin/projects/9")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["projects"].as_array().unwrap().len(), 1);
    assert_eq!(body["projects"][0]["name"], "My Shop");
}
