use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use turfbook::config::AppConfig;
use turfbook::db;
use turfbook::services::clock::SystemClock;
use turfbook::services::directory::DbOwnerDirectory;
use turfbook::services::lifecycle;
use turfbook::services::messaging::twilio::TwilioSmsProvider;
use turfbook::services::notifications::SmsNotifier;
use turfbook::services::payment::razorpay::RazorpayGateway;
use turfbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let db = Arc::new(Mutex::new(conn));

    if config.payment_key_id.is_empty()
        || config.payment_key_secret.is_empty()
        || config.payment_webhook_secret.is_empty()
    {
        tracing::warn!("payment credentials not configured; payment signatures will be rejected");
    }
    let payments = RazorpayGateway::new(
        config.payment_api_url.clone(),
        config.payment_key_id.clone(),
        config.payment_key_secret.clone(),
        config.payment_webhook_secret.clone(),
    );

    let messaging = TwilioSmsProvider::from_config(&config);
    if !messaging.is_configured() {
        tracing::warn!("SMS provider not configured; notifications will be dropped");
    }
    let notifier = SmsNotifier::new(Box::new(messaging), config.payment_currency.clone());

    let (events, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::clone(&db),
        config: config.clone(),
        clock: Box::new(SystemClock::new(config.utc_offset_minutes)),
        owners: Box::new(DbOwnerDirectory::new(db)),
        payments: Box::new(payments),
        notifier: Box::new(notifier),
        events,
    });

    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        "starting lifecycle scheduler"
    );
    tokio::spawn(lifecycle::run_lifecycle_scheduler(Arc::clone(&state)));

    let app = turfbook::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
