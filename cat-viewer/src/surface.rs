use crate::types::{LoadNotifier, LoadSignal, MediaSurface, Result, ViewerConfig, ViewerError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Frames kept around after they leave the display, for rollback.
const RECENT_FRAMES: usize = 4;

/// A media resource that finished loading.
#[derive(Debug, Clone)]
pub struct Frame {
    pub source: Url,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct SurfaceState {
    generation: u64,
    pending: Option<JoinHandle<()>>,
    displayed: Option<Frame>,
    /// Previously displayed frames, newest first.
    recent: VecDeque<Frame>,
    /// Bumped every time `displayed` changes.
    serial: u64,
    alt_text: String,
    dimmed: bool,
}

impl SurfaceState {
    fn show(&mut self, frame: Option<Frame>) {
        let previous = std::mem::replace(&mut self.displayed, frame);
        if let Some(previous) = previous {
            self.recent.retain(|f| f.source != previous.source);
            self.recent.push_front(previous);
            self.recent.truncate(RECENT_FRAMES);
        }
        self.serial += 1;
    }

    fn abandon_pending(&mut self) {
        self.generation += 1;
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }
    }
}

/// Writes the displayed frame to a file. Holds the serial of the last frame
/// written so each change is mirrored once and the newest frame always wins.
struct OutputMirror {
    path: PathBuf,
    written: Mutex<u64>,
}

impl OutputMirror {
    async fn sync(&self, state: &RwLock<SurfaceState>) -> Result<()> {
        let mut written = self.written.lock().await;
        let (serial, frame) = {
            let state = state.read().await;
            match &state.displayed {
                Some(frame) if state.serial != *written => (state.serial, frame.clone()),
                _ => return Ok(()),
            }
        };

        tokio::fs::write(&self.path, &frame.bytes).await?;
        debug!("Mirrored {} to {}", frame.source, self.path.display());
        *written = serial;
        Ok(())
    }
}

/// Surface that downloads each source over HTTP and keeps the bytes of the
/// displayed frame, optionally mirroring it to a file.
///
/// Only the most recent load may display: starting another load or restoring
/// aborts the download in flight, and a frame whose swap stopped waiting is
/// dropped rather than shown.
pub struct HttpMediaSurface {
    client: Client,
    max_media_bytes: u64,
    output: Option<Arc<OutputMirror>>,
    state: Arc<RwLock<SurfaceState>>,
}

impl HttpMediaSurface {
    pub fn new(config: &ViewerConfig, output: Option<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            max_media_bytes: (config.max_media_size_mb as u64) * 1024 * 1024,
            output: output.map(|path| {
                Arc::new(OutputMirror {
                    path,
                    written: Mutex::new(0),
                })
            }),
            state: Arc::new(RwLock::new(SurfaceState::default())),
        })
    }

    pub async fn displayed(&self) -> Option<Frame> {
        self.state.read().await.displayed.clone()
    }

    pub async fn alt_text(&self) -> String {
        self.state.read().await.alt_text.clone()
    }

    pub async fn is_dimmed(&self) -> bool {
        self.state.read().await.dimmed
    }

    /// Wait until the output file holds the displayed frame.
    pub async fn flush_output(&self) -> Result<()> {
        match &self.output {
            Some(output) => output.sync(&self.state).await,
            None => Ok(()),
        }
    }

    fn spawn_mirror(&self) {
        if let Some(output) = self.output.clone() {
            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(e) = output.sync(&state).await {
                    warn!("Could not write {}: {}", output.path.display(), e);
                }
            });
        }
    }

    async fn load(
        client: Client,
        max_media_bytes: u64,
        output: Option<Arc<OutputMirror>>,
        state: Arc<RwLock<SurfaceState>>,
        generation: u64,
        source: Url,
        notifier: LoadNotifier,
    ) {
        let frame = match download(&client, &source, max_media_bytes).await {
            Ok(frame) => frame,
            Err(e) => {
                notifier.failed(e.to_string());
                return;
            }
        };

        if notifier.is_abandoned() {
            debug!("Nobody is waiting for {}; dropping it", source);
            return;
        }

        {
            let mut state = state.write().await;
            if state.generation != generation {
                debug!("Discarding stale frame for {}", source);
                return;
            }
            state.pending = None;

            // Delivery and display happen under the same lock, so a swap
            // that has already timed out can never see this frame shown.
            if !notifier.loaded() {
                debug!("Swap for {} stopped waiting; dropping the frame", source);
                return;
            }

            info!("Displaying {} ({} bytes)", source, frame.bytes.len());
            state.show(Some(frame));
        }

        if let Some(output) = output {
            if let Err(e) = output.sync(&state).await {
                warn!("Could not write {}: {}", output.path.display(), e);
            }
        }
    }
}

#[async_trait]
impl MediaSurface for HttpMediaSurface {
    async fn begin_load(&self, source: &Url) -> LoadSignal {
        let (notifier, signal) = LoadSignal::channel();
        let mut state = self.state.write().await;
        state.abandon_pending();

        let task = tokio::spawn(Self::load(
            self.client.clone(),
            self.max_media_bytes,
            self.output.clone(),
            self.state.clone(),
            state.generation,
            source.clone(),
            notifier,
        ));
        state.pending = Some(task);
        signal
    }

    async fn restore(&self, source: Option<&Url>) {
        let changed = {
            let mut state = self.state.write().await;
            state.abandon_pending();

            let displayed = state.displayed.as_ref().map(|frame| &frame.source);
            if displayed == source {
                false
            } else {
                match source {
                    None => {
                        state.show(None);
                        true
                    }
                    Some(source) => match state.recent.iter().position(|f| &f.source == source) {
                        Some(index) => {
                            let frame = state.recent.remove(index);
                            debug!("Reinstating {}", source);
                            state.show(frame);
                            true
                        }
                        None => {
                            warn!(
                                "No frame kept for {}; surface keeps showing {:?}",
                                source,
                                state.displayed.as_ref().map(|f| f.source.as_str())
                            );
                            false
                        }
                    },
                }
            }
        };

        if changed {
            self.spawn_mirror();
        }
    }

    async fn set_alt_text(&self, alt_text: &str) {
        self.state.write().await.alt_text = alt_text.to_string();
    }

    async fn set_dimmed(&self, dimmed: bool) {
        self.state.write().await.dimmed = dimmed;
    }
}

async fn download(client: &Client, source: &Url, max_media_bytes: u64) -> Result<Frame> {
    let response = client.get(source.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ViewerError::MediaLoad(format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }

    if let Some(length) = response.content_length() {
        if length > max_media_bytes {
            return Err(ViewerError::MediaLoad(format!("payload too large: {} bytes", length)));
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let bytes = response.bytes().await?.to_vec();
    if bytes.len() as u64 > max_media_bytes {
        return Err(ViewerError::MediaLoad(format!("payload too large: {} bytes", bytes.len())));
    }

    let declared_image = content_type
        .as_deref()
        .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"));
    if !declared_image && !looks_like_image(&bytes) {
        return Err(ViewerError::MediaLoad(format!(
            "response is not an image (content type {})",
            content_type.as_deref().unwrap_or("unknown")
        )));
    }
    if bytes.is_empty() {
        return Err(ViewerError::MediaLoad("empty response body".to_string()));
    }

    Ok(Frame {
        source: source.clone(),
        content_type,
        bytes,
    })
}

/// Sniff the magic numbers of the formats the API serves.
pub fn looks_like_image(bytes: &[u8]) -> bool {
    bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
        || bytes.starts_with(&[0xFF, 0xD8, 0xFF])
        || (bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
}
