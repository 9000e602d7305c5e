use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot, Notify},
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tempbuddy_common::{sensor::parse_reading, FormFields, NetworkMode, SettingsStore};

use crate::{
    control_task::{
        run_control_task, AdminReply, ControlContext, ControlRequest, SensorPoll,
        REQUEST_QUEUE_DEPTH,
    },
    file_store::FileStore,
    pages::{self, HtmlPage},
};

const ADMIN_REALM: &str = "AdminRealm";
const REBOOT_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
struct AppState {
    requests: mpsc::Sender<ControlRequest>,
    reboot: Arc<Notify>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_dir = std::env::var("TEMPBUDDY_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.tempbuddy"));
    let store = FileStore::new(data_dir.join("settings.bin"));
    info!("settings block at {}", store.path().display());

    let mut settings = SettingsStore::new(store);
    if env_flag("TEMPBUDDY_FACTORY_RESET") {
        warn!("factory reset requested");
        if let Err(err) = settings.factory_default() {
            warn!("failed to persist factory defaults: {err}");
        }
    } else {
        match settings.load() {
            Ok(true) => info!("restored saved settings"),
            Ok(false) => info!("running with factory default settings"),
            Err(err) => warn!("settings store unavailable, using factory defaults: {err}"),
        }
    }

    log_network_mode(&settings.network_mode());

    let sensor_port = std::env::var("SENSOR_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(80);

    let (requests, receiver) = mpsc::channel(REQUEST_QUEUE_DEPTH);
    let http = reqwest::Client::new();
    tokio::spawn(run_control_task(
        ControlContext::new(settings, sensor_port),
        receiver,
        requests.downgrade(),
        move |poll, readings| spawn_sensor_poll(http.clone(), poll, readings),
        monotonic_ms,
    ));

    let app_state = AppState {
        requests,
        reboot: Arc::new(Notify::new()),
    };

    let app = Router::new()
        .route("/", get(handle_root).post(handle_root))
        .route("/admin", get(handle_admin).post(handle_admin))
        .route("/api/status", get(handle_get_status))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state.clone());

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(app_state.reboot.clone()))
        .await?;
    info!("controller stopped");
    Ok(())
}

async fn shutdown_signal(reboot: Arc<Notify>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!("failed to listen for ctrl-c: {err}");
            }
            info!("shutdown requested");
        }
        _ = reboot.notified() => info!("restarting to apply network settings"),
    }
}

fn log_network_mode(mode: &NetworkMode) {
    match mode {
        NetworkMode::Station { hostname, ssid } => {
            info!("network mode: station, joining '{ssid}' as '{hostname}'");
        }
        NetworkMode::AccessPoint {
            ssid,
            ip,
            subnet,
            gateway,
        } => {
            info!("network mode: access point '{ssid}' at {ip} (subnet {subnet}, gateway {gateway})");
        }
    }
}

fn spawn_sensor_poll(http: reqwest::Client, poll: SensorPoll, readings: mpsc::Sender<ControlRequest>) {
    tokio::spawn(async move {
        match poll_sensor(&http, &poll).await {
            Ok(Some(temp_f)) => {
                if readings
                    .send(ControlRequest::SensorReading { temp_f })
                    .await
                    .is_err()
                {
                    warn!("control task gone; dropping sensor reading");
                }
            }
            Ok(None) => warn!("sensor at {} sent an unrecognized payload", poll.url),
            Err(err) => warn!("sensor poll failed: {err:#}"),
        }
    });
}

async fn poll_sensor(http: &reqwest::Client, poll: &SensorPoll) -> anyhow::Result<Option<f32>> {
    let response = http
        .get(&poll.url)
        .timeout(poll.timeout)
        .send()
        .await
        .with_context(|| format!("request to {} failed", poll.url))?
        .error_for_status()?;
    let body = response.text().await?;
    Ok(parse_reading(&body))
}

/// Sends a request to the control task and waits for its reply.
async fn ask<T>(
    state: &AppState,
    build: impl FnOnce(oneshot::Sender<T>) -> ControlRequest,
) -> Option<T> {
    let (reply, response) = oneshot::channel();
    state.requests.send(build(reply)).await.ok()?;
    response.await.ok()
}

async fn handle_root(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    let form = request_form(query.as_deref(), &body);
    match ask(&state, |reply| ControlRequest::RootForm { form, reply }).await {
        Some(page) => html_response(page),
        None => control_unavailable(),
    }
}

async fn handle_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_credentials);
    let form = request_form(query.as_deref(), &body);

    let reply = ask(&state, |reply| ControlRequest::Admin {
        credentials,
        form,
        reply,
    })
    .await;

    match reply {
        Some(AdminReply::Unauthorized) => unauthorized_response(),
        Some(AdminReply::Page {
            page,
            reboot_required,
        }) => {
            if reboot_required {
                let reboot = state.reboot.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(REBOOT_DELAY).await;
                    reboot.notify_one();
                });
            }
            html_response(page)
        }
        None => control_unavailable(),
    }
}

async fn handle_get_status(State(state): State<AppState>) -> Response {
    match ask(&state, |reply| ControlRequest::Status { reply }).await {
        Some(status) => Json(status).into_response(),
        None => control_unavailable(),
    }
}

async fn handle_not_found() -> Response {
    html_response(pages::not_found_page())
}

/// Query string fields first, then the urlencoded body.
fn request_form(query: Option<&str>, body: &str) -> FormFields {
    let mut form = FormFields::parse(query.unwrap_or(""));
    form.extend(FormFields::parse(body));
    form
}

fn parse_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pwd) = decoded.split_once(':')?;
    Some((user.to_string(), pwd.to_string()))
}

fn unauthorized_response() -> Response {
    let page = pages::render_page(
        401,
        "401 Unauthorized",
        "Authentication failed!",
        "Valid admin credentials are required.",
        None,
    );
    let mut response = html_response(page);
    if let Ok(challenge) = format!("Basic realm=\"{ADMIN_REALM}\"").parse() {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, challenge);
    }
    response
}

fn html_response(page: HtmlPage) -> Response {
    let status = StatusCode::from_u16(page.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Html(page.body)).into_response()
}

fn control_unavailable() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "control task unavailable")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
