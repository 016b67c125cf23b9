use crate::cli::ServeArgs;
use crate::infra::{AppMailer, AppState};
use crate::routes::with_api_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Duration;
use solar_verify::config::{AppConfig, ConfigError};
use solar_verify::error::AppError;
use solar_verify::telemetry;
use solar_verify::workflows::delivery::{
    AnalysisStore, CodeVerificationService, DeliveryGate, InMemoryAnalysisStore,
    InMemoryCodeStore, InMemoryDeliveryGate, MagicLinkService, ReportMailer, TokenService,
};
use solar_verify::workflows::quotes::{QuoteAnalysisService, StaticBenchmarks};
use solar_verify::workflows::usage::{InMemoryUsageStore, UsageService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5 * 60);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    if config.magic_link.secret_generated {
        warn!(
            "APP_TOKEN_SECRET not set; using a per-process signing secret, \
             issued links will not survive a restart"
        );
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let benchmarks = StaticBenchmarks::named(&config.pricing.ruleset)
        .ok_or_else(|| ConfigError::UnknownRuleset(config.pricing.ruleset.clone()))?;
    let usage_service = Arc::new(UsageService::new(Arc::new(InMemoryUsageStore::default())));
    let quote_service = Arc::new(
        QuoteAnalysisService::new(Arc::new(benchmarks), config.pricing.solar_fallback)
            .with_usage(usage_service.clone()),
    );

    let mailer = Arc::new(AppMailer::from_config(&config.mail));
    let tokens = TokenService::new(
        config.magic_link.signing_secret.as_bytes(),
        Duration::minutes(config.magic_link.token_ttl_minutes),
    );
    let link_service = Arc::new(MagicLinkService::new(
        tokens,
        Arc::new(InMemoryAnalysisStore::default()),
        Arc::new(InMemoryDeliveryGate::default()),
        mailer.clone(),
        config.magic_link.public_url.clone(),
    ));
    let code_service = Arc::new(CodeVerificationService::new(
        Arc::new(InMemoryCodeStore::default()),
        mailer.clone(),
        Duration::minutes(config.magic_link.code_ttl_minutes),
        config.magic_link.code_max_attempts,
    ));

    let _sweeper = spawn_sweeper(link_service.clone());

    let app = with_api_routes(quote_service, link_service, code_service, usage_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        ruleset = %config.pricing.ruleset,
        mail_transport = mailer.transport(),
        "solar verify api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically drop stored analyses whose links no longer verify.
fn spawn_sweeper<S, G, M>(service: Arc<MagicLinkService<S, G, M>>) -> JoinHandle<()>
where
    S: AnalysisStore + 'static,
    G: DeliveryGate + 'static,
    M: ReportMailer + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(error) = service.sweep() {
                warn!(%error, "analysis sweep failed");
            }
        }
    })
}
