use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use axum::{extract::State, response::Html, routing::get, Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use tempbuddy_common::{sensor::SENSOR_INFO_PATH, SensorInfo, TempUnit};

#[derive(Clone)]
struct SensorState {
    tick: Arc<AtomicU64>,
    unit: TempUnit,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let unit = std::env::var("SENSOR_TEMP_UNIT")
        .ok()
        .and_then(|value| TempUnit::from_tag(value.trim()))
        .unwrap_or(TempUnit::Fahrenheit);

    let state = SensorState {
        tick: Arc::new(AtomicU64::new(0)),
        unit,
    };

    let ticker = state.tick.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let tick = ticker.fetch_add(1, Ordering::Relaxed).saturating_add(1);
            debug!("simulated reading advanced to tick {tick}");
        }
    });

    let app = Router::new()
        .route(SENSOR_INFO_PATH, get(handle_get_info))
        .route("/", get(handle_get_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("SENSOR_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8081);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind sensor server at {addr}"))?;

    info!("sensor simulator listening on http://{addr} (unit {})", unit.as_str());
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_get_info(State(state): State<SensorState>) -> Json<SensorInfo> {
    Json(simulated_reading(state.tick.load(Ordering::Relaxed), state.unit))
}

async fn handle_get_page(State(state): State<SensorState>) -> Html<String> {
    Html(legacy_page(&simulated_reading(
        state.tick.load(Ordering::Relaxed),
        state.unit,
    )))
}

/// Deterministic drift around 68F so the controller's band logic gets
/// exercised without real hardware.
fn simulated_reading(tick: u64, unit: TempUnit) -> SensorInfo {
    // Hardware integration point: swap in the DS18B20/DHT11 drivers here.
    let temperature_f = 68.0 + ((tick % 8) as f32 * 0.5) - 1.5;
    let humidity = 42.0 + ((tick % 6) as f32 * 0.5);

    let temp = match unit {
        TempUnit::Fahrenheit => temperature_f,
        TempUnit::Celsius => (temperature_f - 32.0) * 5.0 / 9.0,
    };

    SensorInfo {
        humidity: Some(humidity),
        ..SensorInfo::new(round_tenths(temp), unit)
    }
}

fn legacy_page(reading: &SensorInfo) -> String {
    let unit = reading.temp_unit.to_ascii_uppercase();
    let humidity = reading
        .humidity
        .map(|value| format!("<p>Humidity: {value:.1}%</p>"))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE HTML><html><body><h1>TempBuddy</h1><p>Temperature: {:.1}&deg;{unit}</p>{humidity}</body></html>",
        reading.temp
    )
}

fn round_tenths(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
