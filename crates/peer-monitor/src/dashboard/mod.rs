//! HTTP surface of the monitor.
//!
//! # Pages
//!
//! - `/`, `/index.html` - embedded dashboard, polls the API every 2 seconds
//!
//! # API Endpoints
//!
//! - `GET /health` - liveness, always `{"ok":true}`
//! - `GET /peers` - all peers, most recently active first
//! - `GET /logs` - last 100 activity entries, oldest first
//! - `GET /stats` - uptime, traffic totals and resource snapshot
//! - `POST /send` - record a transfer between two peers
//!
//! Unknown routes answer 404 with a plain-text body. Failures other than
//! send validation answer 500 with `error: <message>`.

pub mod types;

pub use types::*;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use rust_embed::Embed;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use tracing::warn;
use warp::Filter;
use warp::http::StatusCode;
use warp::reply::Reply;

use crate::activity::RECENT_LOG_WINDOW;
use crate::error::MonitorError;
use crate::registry::SendRequest;
use crate::sampler::ResourceSampler;
use crate::state::MonitorState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Embedded static files from the static/ directory.
#[derive(Embed)]
#[folder = "static/"]
struct StaticFiles;

/// Create the full route table, including rejection handling.
pub fn monitor_routes(
    state: Arc<MonitorState>,
    sampler: Arc<ResourceSampler>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let index = warp::get()
        .and(warp::path::end().or(warp::path("index.html").and(warp::path::end())).unify())
        .and_then(serve_index);

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .map(|| warp::reply::json(&HealthResponse { ok: true }));

    let peers = warp::get()
        .and(warp::path("peers"))
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .and_then(get_peers);

    let logs = warp::get()
        .and(warp::path("logs"))
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .and_then(get_logs);

    let stats = warp::get()
        .and(warp::path("stats"))
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .and(with_sampler(sampler))
        .and_then(get_stats);

    let send = warp::post()
        .and(warp::path("send"))
        .and(warp::path::end())
        .and(warp::body::stream())
        .and(with_state(state))
        .and_then(post_send);

    let api = health.or(peers).or(logs).or(stats).or(send).boxed();

    index.or(api).recover(handle_rejection)
}

fn with_state(
    state: Arc<MonitorState>,
) -> impl Filter<Extract = (Arc<MonitorState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn with_sampler(
    sampler: Arc<ResourceSampler>,
) -> impl Filter<Extract = (Arc<ResourceSampler>,), Error = Infallible> + Clone {
    warp::any().map(move || sampler.clone())
}

async fn serve_index() -> Result<impl warp::Reply, warp::Rejection> {
    match StaticFiles::get("index.html") {
        Some(content) => Ok(warp::reply::html(
            String::from_utf8_lossy(content.data.as_ref()).to_string(),
        )),
        None => Err(warp::reject::not_found()),
    }
}

async fn get_peers(state: Arc<MonitorState>) -> Result<impl warp::Reply, warp::Rejection> {
    let peers = state.peers().await;
    Ok(warp::reply::json(&peers))
}

async fn get_logs(state: Arc<MonitorState>) -> Result<impl warp::Reply, warp::Rejection> {
    let entries = state.recent_activity(RECENT_LOG_WINDOW).await;
    Ok(warp::reply::json(&entries))
}

async fn get_stats(
    state: Arc<MonitorState>,
    sampler: Arc<ResourceSampler>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let totals = state.totals().await;
    let snapshot = sampler.snapshot().await;

    let stats = StatsResponse {
        uptime_sec: state.uptime().as_secs(),
        total_sent: totals.total_sent,
        total_received: totals.total_received,
        loop_lag_millis: snapshot.loop_lag_millis,
        cpu: CpuStatsApi {
            percent: snapshot.cpu_percent,
        },
        memory: snapshot.memory,
        platform: PlatformApi::new(sampler.platform(), snapshot.cores),
    };
    Ok(warp::reply::json(&stats))
}

/// Record a send. Blank endpoints answer 400 with a JSON error; every
/// other failure becomes a rejection and is rendered as a 500.
async fn post_send<S, B>(
    body: S,
    state: Arc<MonitorState>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, warp::Rejection>
where
    S: Stream<Item = Result<B, warp::Error>> + Send,
    B: Buf + Send,
{
    let raw = read_body_limited(body, MAX_BODY_BYTES)
        .await
        .map_err(warp::reject::custom)?;
    let request = parse_send_request(&raw).map_err(warp::reject::custom)?;

    match state.record_send(&request).await {
        Ok(receipt) => Ok(warp::reply::with_status(
            warp::reply::json(&SendResponse::from(receipt)),
            StatusCode::OK,
        )),
        Err(e) if e.is_validation() => Ok(warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new(e.to_string())),
            StatusCode::BAD_REQUEST,
        )),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

/// An empty body is read as `{}`.
fn parse_send_request(raw: &[u8]) -> Result<SendRequest, MonitorError> {
    if raw.is_empty() {
        return Ok(SendRequest::default());
    }
    Ok(serde_json::from_slice(raw)?)
}

/// Accumulate a streamed body, giving up as soon as it grows past `limit`.
pub async fn read_body_limited<S, B, E>(body: S, limit: usize) -> Result<Bytes, MonitorError>
where
    S: Stream<Item = Result<B, E>>,
    B: Buf,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    let mut buf = BytesMut::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| MonitorError::Transport(e.to_string()))?;
        if buf.len().saturating_add(chunk.remaining()) > limit {
            return Err(MonitorError::BodyTooLarge);
        }
        buf.put(chunk);
    }

    Ok(buf.freeze())
}

async fn handle_rejection(err: warp::Rejection) -> Result<warp::reply::Response, Infallible> {
    if let Some(e) = err.find::<MonitorError>() {
        warn!(error = %e, "Request failed");
        return Ok(
            warp::reply::with_status(format!("error: {e}"), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response(),
        );
    }

    Ok(warp::reply::with_status("not found", StatusCode::NOT_FOUND).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: Vec<&'static str>) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        stream::iter(
            parts
                .into_iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes()))),
        )
    }

    #[tokio::test]
    async fn test_read_body_concatenates_chunks() {
        let body = read_body_limited(chunks(vec!["{\"from\":", "\"a\"}"]), 64)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"from\":\"a\"}");
    }

    #[tokio::test]
    async fn test_read_body_at_limit_is_accepted() {
        let body = read_body_limited(chunks(vec!["abcd", "efgh"]), 8)
            .await
            .unwrap();
        assert_eq!(body.len(), 8);
    }

    #[tokio::test]
    async fn test_read_body_over_limit_aborts() {
        let err = read_body_limited(chunks(vec!["abcd", "efgh", "i"]), 8)
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::BodyTooLarge));
        assert_eq!(err.to_string(), "body too large");
    }

    #[tokio::test]
    async fn test_read_body_stops_pulling_after_limit() {
        let pulled = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = pulled.clone();
        let body = stream::iter(0..100).map(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok::<_, std::io::Error>(Bytes::from_static(b"0123456789"))
        });

        let err = read_body_limited(body, 25).await.unwrap_err();
        assert!(matches!(err, MonitorError::BodyTooLarge));
        assert_eq!(pulled.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_body_stream_error_is_transport() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"{")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let err = read_body_limited(body, 64).await.unwrap_err();
        assert!(matches!(err, MonitorError::Transport(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_empty_body_reads_as_empty_request() {
        assert_eq!(parse_send_request(b"").unwrap(), SendRequest::default());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_send_request(b"{not json").unwrap_err();
        assert!(matches!(err, MonitorError::MalformedBody(_)));
    }

    #[tokio::test]
    async fn test_monitor_errors_recover_as_plain_text() {
        for (err, body) in [
            (MonitorError::BodyTooLarge, "error: body too large"),
            (
                MonitorError::Transport("reset".to_string()),
                "error: transport error: reset",
            ),
        ] {
            let res = handle_rejection(warp::reject::custom(err)).await.unwrap();
            assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let bytes = warp::hyper::body::to_bytes(res.into_body()).await.unwrap();
            assert_eq!(&bytes[..], body.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_other_rejections_are_not_found() {
        let res = handle_rejection(warp::reject::not_found()).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_dashboard_page_is_embedded() {
        let page = StaticFiles::get("index.html").expect("index.html embedded");
        let html = String::from_utf8_lossy(page.data.as_ref());
        assert!(html.contains("/stats"));
        assert!(html.contains("/send"));
    }
}
