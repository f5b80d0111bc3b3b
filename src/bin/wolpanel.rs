use wolpanel::ping;
use wolpanel::wol;
use wolpanel::wol::MacAddr;
use wolpanel::wol::WolError;

use axum::extract;
use axum::http::header;
use axum::http::Request;
use axum::http::StatusCode;
use axum::middleware;
use axum::response;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing;
use axum::Router;
use clap::Parser;
use lazy_static::lazy_static;
use log::info;
use log::warn;
use prometheus::register_int_counter;
use prometheus::register_int_counter_vec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use serde::Serialize;

lazy_static! {
    static ref WAKE_PACKETS_SENT: IntCounter = register_int_counter!(
        "wolpanel_wake_packets_sent_total",
        "Magic packets handed to the socket layer."
    )
    .unwrap();
    static ref PROBES: IntCounterVec = register_int_counter_vec!(
        "wolpanel_reachability_probes_total",
        "Reachability probes by outcome.",
        &["alive"]
    )
    .unwrap();
}

async fn index() -> impl IntoResponse {
    response::Html(include_str!("../index.html"))
}

async fn favicon() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        include_str!("../favicon.svg"),
    )
}

#[derive(Serialize)]
struct WakeResponse {
    ok: bool,
    message: String,
}

#[derive(Serialize)]
struct AliveResponse {
    alive: bool,
}

async fn trigger_wake(
    state: extract::State<AppState>,
) -> response::Result<response::Json<WakeResponse>> {
    (state.wake)(&state.mac_addr, state.wol_port).map_err(|e| {
        warn!("wake failed: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", e)).into_response()
    })?;
    WAKE_PACKETS_SENT.inc();
    Ok(response::Json(WakeResponse {
        ok: true,
        message: format!("magic packet sent to {}", state.mac_addr),
    }))
}

async fn query_alive(state: extract::State<AppState>) -> response::Json<AliveResponse> {
    let alive = ping::check(&state.host_addr, ping::PROBE_TIMEOUT).await;
    PROBES.with_label_values(&[if alive { "true" } else { "false" }]).inc();
    response::Json(AliveResponse { alive })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Invalid endpoint\n")
}

async fn varz() -> response::Result<impl IntoResponse> {
    let metrics = prometheus::gather();
    let encoder = prometheus::TextEncoder::new();
    encoder
        .encode_to_string(&metrics)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", e)).into())
}

async fn add_observability<B>(
    req: Request<B>,
    next: middleware::Next<B>,
) -> response::Result<Response> {
    let path = format!("{:?}", req.uri().path_and_query().unwrap());
    let resp = next.run(req).await;
    info!(
        "{request} {status}",
        request = path,
        status = resp.status().as_str(),
    );
    Ok(resp)
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    http_addr: String,

    /// Hardware address of the machine to wake, in xx:xx:xx:xx:xx:xx form.
    #[arg(long, env = "WOL_MAC_ADDR")]
    mac_addr: String,

    /// Hostname or IP the reachability check probes.
    #[arg(long, env = "WOL_HOST_ADDR")]
    host_addr: String,

    /// UDP port the magic packet is broadcast to (9 and 7 are conventional).
    #[arg(long, env = "WOL_PORT", default_value_t = 9)]
    wol_port: u16,
}

#[derive(Clone)]
struct AppState {
    mac_addr: MacAddr,
    host_addr: String,
    wol_port: u16,
    // the send itself, swappable so tests can force either outcome
    wake: fn(&MacAddr, u16) -> Result<(), WolError>,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", routing::get(index))
        .route("/wol", routing::get(trigger_wake))
        .route("/ping", routing::get(query_alive))
        .route("/favicon.svg", routing::get(favicon))
        .route("/varz", routing::get(varz))
        .fallback(not_found)
        .route_layer(middleware::from_fn(add_observability))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("INFO"))
        .format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis))
        .init();

    let mac_addr: MacAddr = args.mac_addr.parse()?;
    let state = AppState {
        mac_addr,
        host_addr: args.host_addr,
        wol_port: args.wol_port,
        wake: wol::wake,
    };

    info!(
        "Starting server on {} (wake {}, probe {})...",
        args.http_addr, state.mac_addr, state.host_addr
    );
    axum::Server::bind(&args.http_addr.parse()?)
        .serve(app(state).into_make_service())
        .await?;
    Ok(())
}
