use axum::{
    extract::{FromRef, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use callflow::{CallFlow, EventPublisher, TelephonyProvider};

mod adapters;
mod application;
mod auth;
mod config;
mod models;
mod routes;
mod services;

use adapters::{
    BroadcastPublisher, HttpDelivery, PgCallSessionRepository, PgDeliveryTaskRepository,
    PgScriptRepository, VonageClient,
};
use application::{CallFlowService, DeliveryQueue, ScriptService};
use auth::ApiKey;
use config::AppConfig;
use services::RetryScheduler;

/// Type aliases for application services with concrete repository implementations
pub type AppCallFlowService =
    CallFlowService<PgCallSessionRepository, PgScriptRepository, PgDeliveryTaskRepository>;
pub type AppScriptService = ScriptService<PgScriptRepository>;
pub type AppDeliveryQueue = DeliveryQueue<PgDeliveryTaskRepository>;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub call_service: Arc<AppCallFlowService>,
    pub script_service: Arc<AppScriptService>,
    pub delivery_queue: Arc<AppDeliveryQueue>,
    pub live: Arc<BroadcastPublisher>,
    pub api_key: ApiKey,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}

impl FromRef<AppState> for ApiKey {
    fn from_ref(state: &AppState) -> ApiKey {
        state.api_key.clone()
    }
}

#[derive(Serialize)]
struct HealthCheck {
    status: String,
    message: String,
    database: String,
    version: String,
}

async fn health_check(State(pool): State<PgPool>) -> Json<HealthCheck> {
    let database = match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => "ok".to_string(),
        Err(e) => {
            tracing::warn!("⚠️  Health check database ping failed: {}", e);
            "unavailable".to_string()
        }
    };

    Json(HealthCheck {
        status: "ok".to_string(),
        message: "Callflow API is running".to_string(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[shuttle_runtime::main]
async fn main(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secrets: shuttle_runtime::SecretStore,
) -> shuttle_axum::ShuttleAxum {
    tracing::info!("📞 Callflow API initializing...");

    let config = AppConfig::from_secrets(&secrets)
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let api_key = ApiKey::new(config.api_key.clone());
    if api_key.is_enabled() {
        tracing::info!("🔐 API key authentication enabled");
    } else {
        tracing::warn!("⚠️  No CALLFLOW_API_KEY set - authentication disabled");
    }

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run database migrations: {e}"))?;

    tracing::info!("✅ Database migrations completed");

    // Telephony provider, if configured
    let telephony: Option<Arc<dyn TelephonyProvider>> = match config.vonage.clone() {
        Some(vonage) => {
            let client = VonageClient::new(vonage)
                .map_err(|e| anyhow::anyhow!("Failed to initialize Vonage client: {e}"))?;
            tracing::info!("☎️  Vonage telephony provider initialized");
            Some(Arc::new(client) as Arc<dyn TelephonyProvider>)
        }
        None => {
            tracing::warn!(
                "⚠️  No VONAGE_API_TOKEN/VONAGE_FROM_NUMBER set - outbound calls disabled"
            );
            None
        }
    };

    if config.admin_phone.is_none() {
        tracing::warn!("⚠️  No ADMIN_PHONE set - escalation disabled");
    }

    // Initialize application services
    let live = Arc::new(BroadcastPublisher::default());
    let publisher: Arc<dyn EventPublisher> = live.clone();

    let session_repo = Arc::new(PgCallSessionRepository::new(pool.clone()));
    let script_repo = Arc::new(PgScriptRepository::new(pool.clone()));
    let delivery_repo = Arc::new(PgDeliveryTaskRepository::new(pool.clone()));

    let delivery_queue = Arc::new(DeliveryQueue::new(
        delivery_repo,
        publisher.clone(),
        config.delivery_max_retries,
    ));
    let script_service = Arc::new(ScriptService::new(script_repo.clone()));
    let call_service = Arc::new(
        CallFlowService::new(
            session_repo,
            script_repo,
            delivery_queue.clone(),
            CallFlow::new(config.flow_settings(), config.webhook_urls()),
            publisher,
        )
        .with_telephony(telephony)
        .with_admin_phone(config.admin_phone.clone()),
    );

    // Start the delivery retry scheduler
    let transport = HttpDelivery::new(
        config.scheduler.attempt_timeout,
        config.delivery_signing_secret.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize delivery transport: {e}"))?;
    let _scheduler =
        RetryScheduler::new(delivery_queue.clone(), Arc::new(transport), config.scheduler.clone())
            .start();

    // Create application state
    let state = AppState {
        pool,
        call_service,
        script_service,
        delivery_queue,
        live,
        api_key: api_key.clone(),
    };

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .merge(routes::scripts::router())
        .merge(routes::calls::router())
        .merge(routes::deliveries::router())
        .merge(routes::live::router())
        .layer(middleware::from_fn_with_state(api_key, auth::auth_middleware));

    // OpenAPI documentation
    let openapi = routes::swagger::ApiDoc::openapi();

    // Build router with shared state
    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .route("/health", get(health_check))
        .merge(routes::webhooks::router())
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!("🔗 Provider webhooks: {}", config.webhook_urls().answer());
    tracing::info!("📚 Swagger UI: /swagger-ui");
    tracing::info!("✅ Callflow API ready");

    Ok(router.into())
}
