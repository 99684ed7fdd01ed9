#![allow(dead_code)]

// Shared fakes for the integration tests
use async_trait::async_trait;
use cat_viewer::types::*;
use cat_viewer::{CatApi, CatService, RandomSource};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

pub const TEST_BASE_URL: &str = "https://cats.test";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn url(s: &str) -> Url {
    Url::parse(s).expect("valid test url")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Every load succeeds immediately
    Succeed,
    /// Every load errors immediately
    Fail,
    /// The notifier is dropped without settling
    Abandon,
    /// Loads stay pending until the test settles them
    Manual,
}

/// Surface whose load signals are driven by the test.
pub struct ScriptedSurface {
    mode: Mutex<SurfaceMode>,
    pending: Mutex<Vec<(Url, LoadNotifier)>>,
    shown: Mutex<Option<Url>>,
    loads: Mutex<Vec<Url>>,
    alt_text: Mutex<String>,
    dimmed: Mutex<bool>,
}

impl ScriptedSurface {
    pub fn new(mode: SurfaceMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            pending: Mutex::new(Vec::new()),
            shown: Mutex::new(None),
            loads: Mutex::new(Vec::new()),
            alt_text: Mutex::new(String::new()),
            dimmed: Mutex::new(false),
        }
    }

    pub fn set_mode(&self, mode: SurfaceMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn shown(&self) -> Option<Url> {
        self.shown.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<Url> {
        self.loads.lock().unwrap().clone()
    }

    pub fn alt_text(&self) -> String {
        self.alt_text.lock().unwrap().clone()
    }

    pub fn is_dimmed(&self) -> bool {
        *self.dimmed.lock().unwrap()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn take_pending(&self, source: &Url) -> LoadNotifier {
        let mut pending = self.pending.lock().unwrap();
        let index = pending
            .iter()
            .position(|(url, _)| url == source)
            .expect("no pending load for source");
        pending.remove(index).1
    }

    pub async fn wait_for_pending(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.pending_count() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("pending loads never showed up");
    }
}

#[async_trait]
impl MediaSurface for ScriptedSurface {
    async fn begin_load(&self, source: &Url) -> LoadSignal {
        self.loads.lock().unwrap().push(source.clone());
        *self.shown.lock().unwrap() = Some(source.clone());

        let (notifier, signal) = LoadSignal::channel();
        let mode = *self.mode.lock().unwrap();
        match mode {
            SurfaceMode::Succeed => {
                notifier.loaded();
            }
            SurfaceMode::Fail => {
                notifier.failed("could not decode image");
            }
            SurfaceMode::Abandon => drop(notifier),
            SurfaceMode::Manual => self.pending.lock().unwrap().push((source.clone(), notifier)),
        }
        signal
    }

    async fn restore(&self, source: Option<&Url>) {
        *self.shown.lock().unwrap() = source.cloned();
    }

    async fn set_alt_text(&self, alt_text: &str) {
        *self.alt_text.lock().unwrap() = alt_text.to_string();
    }

    async fn set_dimmed(&self, dimmed: bool) {
        *self.dimmed.lock().unwrap() = dimmed;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Rendered {
    Loading(bool),
    Outcome(SwapOutcome),
    Status(String, StatusVariant),
    TagOptions(Vec<String>),
    FormEnabled(bool),
    TagLoading(bool),
    FormValues(MediaRequest),
    ResetForm,
}

/// View that records every call in order.
#[derive(Default)]
pub struct RecordingView {
    rendered: Mutex<Vec<Rendered>>,
    status: Mutex<StatusLine>,
}

impl RecordingView {
    pub fn rendered(&self) -> Vec<Rendered> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn status(&self) -> StatusLine {
        self.status.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(String, StatusVariant)> {
        self.rendered()
            .into_iter()
            .filter_map(|r| match r {
                Rendered::Status(message, variant) => Some((message, variant)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, rendered: Rendered) {
        self.rendered.lock().unwrap().push(rendered);
    }
}

#[async_trait]
impl CatView for RecordingView {
    async fn render_loading(&self, loading: bool) {
        self.push(Rendered::Loading(loading));
    }

    async fn render_outcome(&self, outcome: &SwapOutcome) {
        self.push(Rendered::Outcome(outcome.clone()));
    }

    async fn render_status(&self, message: &str, variant: StatusVariant) {
        self.status.lock().unwrap().apply(message, variant);
        self.push(Rendered::Status(message.to_string(), variant));
    }

    async fn render_tag_options(&self, tags: &[String]) {
        self.push(Rendered::TagOptions(tags.to_vec()));
    }

    async fn set_form_enabled(&self, enabled: bool) {
        self.push(Rendered::FormEnabled(enabled));
    }

    async fn set_tag_loading(&self, loading: bool) {
        self.push(Rendered::TagLoading(loading));
    }

    async fn set_form_values(&self, request: &MediaRequest) {
        self.push(Rendered::FormValues(request.clone()));
    }

    async fn reset_form(&self) {
        self.push(Rendered::ResetForm);
    }
}

/// Real URL building, canned tag catalog.
pub struct FakeCatService {
    api: CatApi,
    tags: Option<Vec<String>>,
}

impl FakeCatService {
    pub fn with_tags(tags: &[&str]) -> Self {
        Self {
            api: CatApi::with_client(reqwest::Client::new(), TEST_BASE_URL).expect("valid base url"),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            api: CatApi::with_client(reqwest::Client::new(), TEST_BASE_URL).expect("valid base url"),
            tags: None,
        }
    }
}

#[async_trait]
impl CatService for FakeCatService {
    fn build_gif_url(&self, request: &MediaRequest) -> Url {
        self.api.build_gif_url(request)
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        match &self.tags {
            Some(tags) => Ok(tags.clone()),
            None => Err(ViewerError::Fetch { status: 503 }),
        }
    }
}

/// Always rolls the same value.
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.0
    }
}

/// Answer exactly one HTTP request with a canned response. Yields the base
/// URL to hit and the raw request text once it has been read.
pub async fn serve_once(
    status_line: &str,
    content_type: &str,
    body: Vec<u8>,
) -> std::io::Result<(String, oneshot::Receiver<String>)> {
    serve_delayed(Duration::ZERO, status_line, content_type, body).await
}

/// Like [`serve_once`], but holds the response back for `delay` after the
/// request has been read.
pub async fn serve_delayed(
    delay: Duration,
    status_line: &str,
    content_type: &str,
    body: Vec<u8>,
) -> std::io::Result<(String, oneshot::Receiver<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (request_tx, request_rx) = oneshot::channel();

    let head = format!(
        "HTTP/1.1 {}\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        status_line,
        content_type,
        body.len()
    );

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let read = socket.read(&mut buf).await.unwrap_or(0);
            let _ = request_tx.send(String::from_utf8_lossy(&buf[..read]).to_string());
            tokio::time::sleep(delay).await;
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    });

    Ok((format!("http://{}", addr), request_rx))
}
