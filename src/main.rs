use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use coordii_client::app_state::AppState;
use coordii_client::config::ClientConfig;
use coordii_client::controllers::views::{GuideView, HomeView};
use coordii_client::models::job::JobOutput;
use coordii_client::services::poller::JobCallbacks;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = ClientConfig::from_env().expect("Failed to load configuration from environment");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    metrics::describe_counter!("jobs_started_total", "Jobs accepted by the backend");
    metrics::describe_counter!("jobs_completed_total", "Jobs that reached Completed");
    metrics::describe_counter!("jobs_failed_total", "Jobs that reached Failed, including timeouts");
    metrics::describe_counter!("job_poll_errors_total", "Status polls that failed and were retried");
    metrics::describe_counter!("cache_hits_total", "Cache reads served from a valid snapshot");
    metrics::describe_counter!("cache_misses_total", "Cache reads that went to the backend");
    metrics::describe_counter!("events_published_total", "Invalidation events published");

    let state = AppState::from_config(&config).expect("Failed to initialise client state");
    tracing::info!(owner = %state.owner, "Starting coordii client");

    let feed = Arc::new(state.home_feed());
    let region = feed.resolve_region(&config.default_region).await;
    let home = HomeView::mount(Arc::clone(&feed), &state.events, region);
    let guides = GuideView::mount(state.guides.clone(), &state.events);

    match home.render().await {
        Ok(screen) => tracing::info!(
            day_label = screen.day_label,
            region = %screen.region,
            weather = %screen.weather.weather,
            max = screen.weather.max,
            min = screen.weather.min,
            history = screen.history.len(),
            "Home feed rendered"
        ),
        Err(e) => tracing::error!(error = %e, "Home feed unavailable"),
    }
    if let Some(guide) = guides.current() {
        tracing::info!(guide = %guide, "Onboarding guide pending");
    }

    if std::env::args().nth(1).as_deref() == Some("outfit") {
        run_outfit_job(&state).await;
        if home.is_stale() {
            if let Err(e) = home.render().await {
                tracing::warn!(error = %e, "Home feed refresh failed");
            }
        }
    }

    tracing::debug!(metrics = %prometheus_handle.render(), "Metrics snapshot");
}

async fn run_outfit_job(state: &AppState) {
    let (tx, rx) = oneshot::channel::<Result<JobOutput, String>>();
    let tx = Arc::new(std::sync::Mutex::new(Some(tx)));
    let on_failed_tx = Arc::clone(&tx);

    let callbacks = JobCallbacks::new(
        move |output| {
            if let Some(tx) = tx.lock().ok().and_then(|mut tx| tx.take()) {
                let _ = tx.send(Ok(output));
            }
        },
        move |reason| {
            if let Some(tx) = on_failed_tx.lock().ok().and_then(|mut tx| tx.take()) {
                let _ = tx.send(Err(reason));
            }
        },
    );

    let poller = match state.outfits().generate(None, callbacks).await {
        Ok(poller) => poller,
        Err(e) => {
            tracing::error!(error = %e, "Outfit generation could not start");
            return;
        }
    };

    tokio::select! {
        result = rx => match result {
            Ok(Ok(JobOutput::Outfit(outfit))) => tracing::info!(
                coordinate_id = ?outfit.coordinate_id,
                reason = ?outfit.reason,
                "Outfit ready"
            ),
            Ok(Ok(other)) => tracing::warn!(output = ?other, "Unexpected job output"),
            Ok(Err(reason)) => tracing::error!(reason = %reason, "Outfit generation failed"),
            Err(_) => tracing::warn!("Outfit job ended without a result"),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(job_id = %poller.job_id(), "Interrupted, cancelling outfit job");
            poller.cancel();
        }
    }
}
