// Shared helpers for integration tests: mock upstream model servers and a
// live relay bound to an ephemeral port.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::Value;
use tldr_stream::api::{AppState, router};
use tldr_stream::core::config::AppConfig;
use url::Url;

/// What the mock upstream sends back.
#[derive(Clone, Debug)]
pub enum Script {
    /// 200 with these body chunks, a short pause between each.
    Chunks(Vec<Vec<u8>>),
    /// The chunks, then the connection is cut mid-body.
    ChunksThenAbort(Vec<Vec<u8>>),
    /// The same frame forever at a fixed interval.
    Endless { frame: Vec<u8>, every: Duration },
    /// An error status with a short text body.
    Status(u16),
    /// One script per call, in order; the last one repeats.
    Sequence(Vec<Script>),
}

/// Flags when the mock's response body is dropped, i.e. the relay let go of
/// the upstream connection.
struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct MockState {
    script: Script,
    calls: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    released: Arc<AtomicBool>,
}

pub struct MockUpstream {
    pub url: Url,
    pub calls: Arc<AtomicUsize>,
    pub bodies: Arc<Mutex<Vec<Value>>>,
    pub headers: Arc<Mutex<Vec<HeaderMap>>>,
    pub released: Arc<AtomicBool>,
}

impl MockUpstream {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Value {
        self.bodies
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("mock upstream received no request")
    }

    pub fn last_headers(&self) -> HeaderMap {
        self.headers
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("mock upstream received no request")
    }

    pub fn was_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

async fn respond(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let call = state.calls.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().unwrap().push(body);
    state.headers.lock().unwrap().push(headers);

    let guard = ReleaseGuard(Arc::clone(&state.released));
    let pause = Duration::from_millis(5);

    let script = match state.script {
        Script::Sequence(mut scripts) => {
            let index = call.min(scripts.len() - 1);
            scripts.swap_remove(index)
        }
        other => other,
    };

    let stream: futures::stream::BoxStream<'static, Result<Vec<u8>, std::io::Error>> =
        match script {
            Script::Status(code) => {
                let status = StatusCode::from_u16(code).unwrap();
                return (status, "model backend exploded").into_response();
            }
            Script::Chunks(chunks) => futures::stream::iter(chunks)
                .then(move |chunk| async move {
                    tokio::time::sleep(pause).await;
                    Ok::<_, std::io::Error>(chunk)
                })
                .boxed(),
            Script::ChunksThenAbort(chunks) => futures::stream::iter(chunks)
                .then(move |chunk| async move {
                    tokio::time::sleep(pause).await;
                    Ok::<_, std::io::Error>(chunk)
                })
                .chain(futures::stream::once(async {
                    tokio::time::sleep(Duration::from_millis(15)).await;
                    Err(std::io::Error::other("upstream crashed"))
                }))
                .boxed(),
            Script::Endless { frame, every } => futures::stream::repeat(frame)
                .then(move |chunk| async move {
                    tokio::time::sleep(every).await;
                    Ok::<_, std::io::Error>(chunk)
                })
                .boxed(),
            Script::Sequence(_) => panic!("nested script sequences are not supported"),
        };

    let stream = stream.map(move |chunk| {
        let _held = &guard;
        chunk
    });
    Response::new(Body::from_stream(stream))
}

/// Starts a mock upstream answering POSTs on `path`.
pub async fn start_mock_upstream(path: &str, script: Script) -> MockUpstream {
    let state = MockState {
        script,
        calls: Arc::new(AtomicUsize::new(0)),
        bodies: Arc::new(Mutex::new(Vec::new())),
        headers: Arc::new(Mutex::new(Vec::new())),
        released: Arc::new(AtomicBool::new(false)),
    };
    let mock = MockUpstream {
        url: Url::parse("http://127.0.0.1/").unwrap(),
        calls: Arc::clone(&state.calls),
        bodies: Arc::clone(&state.bodies),
        headers: Arc::clone(&state.headers),
        released: Arc::clone(&state.released),
    };

    let app = Router::new().route(path, post(respond)).with_state(state);
    let url = serve(app).await;
    MockUpstream { url, ..mock }
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// An address nothing is listening on.
pub fn closed_port_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/")).unwrap()
}

pub fn config(vars: &[(&str, &str)]) -> AppConfig {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    AppConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
}

pub fn ollama_config(upstream: &Url) -> AppConfig {
    config(&[("OLLAMA_URL", upstream.as_str())])
}

pub fn relay_app(config: &AppConfig) -> Router {
    let upstream = tldr_stream::ai::build_upstream(config).unwrap();
    router(AppState::new(upstream))
}

/// Starts a relay in front of `config`'s upstream and returns its base URL.
pub async fn start_relay(config: &AppConfig) -> Url {
    serve(relay_app(config)).await
}

pub fn ndjson(fragments: &[&str]) -> Vec<u8> {
    fragments
        .iter()
        .map(|f| {
            let line = serde_json::json!({ "model": "qwen2:7b", "response": f, "done": false });
            format!("{line}\n")
        })
        .collect::<String>()
        .into_bytes()
}

pub fn sse(fragments: &[&str]) -> Vec<u8> {
    let mut out = String::new();
    for f in fragments {
        let event = serde_json::json!({
            "object": "chat.completion.chunk",
            "choices": [{ "index": 0, "delta": { "content": f } }]
        });
        out.push_str(&format!("data: {event}\n\n"));
    }
    out.push_str("data: [DONE]\n\n");
    out.into_bytes()
}

pub fn split_every(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

pub async fn wait_until(what: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if what() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    what()
}
