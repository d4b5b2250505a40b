use anyhow::Context;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod adapters;
mod application;
mod config;
mod models;
mod routes;
mod services;

use adapters::{
    AcknowledgeEcho, CommandPrinter, GoogleTranslateTts, PgCallRequestRepository,
    PgCounterRepository, PgTicketRepository, SseBroadcaster, SystemSpeech,
};
use application::{AnnouncementResolver, CallSequencer, PrintDispatcher};
use config::Settings;
use qcall::{
    Announcer, Broadcaster, CallRequestRepository, CounterRepository, PrintStrategy,
    SpeechSynthesizer, TicketRepository,
};
use services::retention::RetentionJanitor;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub sequencer: CallSequencer,
    pub print_dispatcher: PrintDispatcher,
    pub broadcaster: SseBroadcaster,
    pub tickets: Arc<dyn TicketRepository>,
    pub counters: Arc<dyn CounterRepository>,
}

#[derive(Serialize)]
struct HealthCheck {
    status: String,
    message: String,
    version: String,
}

async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        message: "qcall API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn speech_synthesizers(settings: &Settings) -> Vec<Arc<dyn SpeechSynthesizer>> {
    let mut synthesizers: Vec<Arc<dyn SpeechSynthesizer>> = Vec::new();

    match GoogleTranslateTts::new(settings.tts_language.clone(), settings.tts_http_timeout) {
        Ok(tts) => synthesizers.push(Arc::new(tts)),
        Err(e) => tracing::warn!("⚠️  HTTPS speech synthesis unavailable: {}", e),
    }
    synthesizers.push(Arc::new(SystemSpeech::new(
        settings.tts_language.clone(),
        settings.tts_process_timeout,
    )));

    synthesizers
}

fn print_strategies(settings: &Settings) -> Vec<Arc<dyn PrintStrategy>> {
    let mut strategies: Vec<Arc<dyn PrintStrategy>> = CommandPrinter::platform_defaults(
        settings.printer_name.clone(),
        settings.print_spool_dir.clone(),
        settings.print_timeout,
    )
    .into_iter()
    .map(|printer| Arc::new(printer) as Arc<dyn PrintStrategy>)
    .collect();

    let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
    tracing::info!("🖨️ Print strategies: {:?} + acknowledge-echo", names);
    if settings.printer_name.is_none() {
        tracing::debug!("No PRINTER_NAME set, using the system default printer");
    }

    strategies.push(Arc::new(AcknowledgeEcho));
    strategies
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,qcall_server=debug")),
        )
        .init();

    tracing::info!("📣 qcall API initializing...");

    let settings = Settings::from_env().context("Invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("✅ Database migrations completed");

    // Ports
    let requests: Arc<dyn CallRequestRepository> =
        Arc::new(PgCallRequestRepository::new(pool.clone()));
    let tickets: Arc<dyn TicketRepository> = Arc::new(PgTicketRepository::new(pool.clone()));
    let counters: Arc<dyn CounterRepository> = Arc::new(PgCounterRepository::new(pool.clone()));
    let broadcaster = SseBroadcaster::new(256);
    let broadcast_port: Arc<dyn Broadcaster> = Arc::new(broadcaster.clone());

    // Application components
    let announcer: Arc<dyn Announcer> = Arc::new(AnnouncementResolver::new(
        speech_synthesizers(&settings),
        broadcast_port.clone(),
        Some(settings.resolver.clone()),
    ));
    tracing::info!(
        "🔊 Announcement clips in {} served at {}",
        settings.resolver.audio_dir.display(),
        settings.audio_public_path
    );

    let sequencer = CallSequencer::new(
        requests.clone(),
        tickets.clone(),
        counters.clone(),
        announcer,
        broadcast_port.clone(),
        Some(settings.sequencer.clone()),
    );
    let print_dispatcher = PrintDispatcher::new(
        print_strategies(&settings),
        broadcast_port,
        Some(settings.print.clone()),
    );

    sequencer.start();
    print_dispatcher.start();
    RetentionJanitor::new(requests, Some(settings.retention.clone())).start();

    let state = AppState {
        sequencer,
        print_dispatcher,
        broadcaster,
        tickets,
        counters,
    };

    // OpenAPI documentation
    let openapi = routes::swagger::ApiDoc::openapi();

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .route("/health", get(health_check))
        .merge(routes::call::router())
        .merge(routes::print::router())
        .merge(routes::events::router())
        .nest_service(
            &settings.audio_public_path,
            ServeDir::new(&settings.resolver.audio_dir),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;

    tracing::info!("📚 Swagger UI: /swagger-ui");
    tracing::info!("✅ qcall API ready on {}", settings.bind_addr);

    axum::serve(listener, router)
        .await
        .context("Server error")?;

    Ok(())
}
