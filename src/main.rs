//! API Gateway
//!
//! Request-admission front door for the backend services: every request is
//! checked against a static API-key set and a per-identity fixed-window rate
//! limit before it reaches routing.

use actix_web::{web, App, HttpServer, middleware};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_actix_web::TracingLogger;

use api_gateway::admission::{Clock, CounterRegistry, FilterChain, SystemClock};
use api_gateway::api::{self, middleware::AdmissionMiddleware};
use api_gateway::config::Settings;
use api_gateway::error::GatewayError;
use api_gateway::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("api_gateway=info,actix_web=info")),
        )
        .json()
        .init();

    let settings = Settings::load().map_err(GatewayError::Config)?;
    run(settings).await?;
    Ok(())
}

async fn run(settings: Settings) -> Result<(), GatewayError> {
    let bind_addr = settings.bind_addr();

    info!(
        "Starting API Gateway v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let chain = FilterChain::from_settings(&settings, clock);

    let keys = chain.auth().key_store();
    if keys.has_keys() {
        info!(
            key_count = keys.key_count(),
            header = keys.header_name(),
            "API key authentication enabled"
        );
    } else {
        warn!("No API keys configured; all non-allowlisted requests will be rejected");
    }
    info!(
        burst_capacity = settings.rate_limit.burst_capacity,
        window_millis = settings.rate_limit.window_millis,
        registry_max_size = settings.rate_limit.registry_max_size,
        idle_evict_minutes = settings.rate_limit.registry_idle_evict_minutes,
        "Rate limiting configured"
    );

    spawn_registry_sweeper(chain.rate_limit().registry().clone(), &settings);

    let admission = AdmissionMiddleware::new(chain.clone())
        .with_missing_keys_status(settings.security.missing_keys_status);
    let workers = settings.server.workers.unwrap_or_else(|| num_cpus::get() * 2);

    let app_state = web::Data::new(AppState { chain });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            // Admission runs innermost so it sits directly in front of routing
            .wrap(admission.clone())
            .wrap(TracingLogger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "api-gateway"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
            )
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}

/// Periodically drop counters for identities that have gone quiet
fn spawn_registry_sweeper(registry: Arc<CounterRegistry>, settings: &Settings) {
    let period = settings.rate_limit.sweep_interval();

    actix_rt::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = registry.evict_idle();
            debug!(evicted, tracked = registry.len(), "Rate-limit registry sweep");
        }
    });
}
