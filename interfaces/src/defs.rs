use std::fmt;

use async_trait::async_trait;
use tokio::sync::oneshot;
use url::Url;

/// Captions longer than this are truncated by front ends before a request is built.
pub const CAPTION_MAX_CHARS: usize = 30;

/// What the user asked for. Both fields are trimmed on construction and an
/// empty string means "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaRequest {
    tag: String,
    caption: String,
}

impl MediaRequest {
    pub fn new(tag: impl AsRef<str>, caption: impl AsRef<str>) -> Self {
        Self {
            tag: tag.as_ref().trim().to_owned(),
            caption: caption.as_ref().trim().to_owned(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tag(&self) -> Option<&str> {
        (!self.tag.is_empty()).then_some(self.tag.as_str())
    }

    pub fn caption(&self) -> Option<&str> {
        (!self.caption.is_empty()).then_some(self.caption.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_empty() && self.caption.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// No terminal signal arrived within the budget.
    Timeout { after_ms: u64 },
    /// The resource failed to download or decode.
    MediaLoad { message: String },
    /// A newer swap started before this one settled.
    Superseded,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout { after_ms } => {
                write!(f, "timed out after {}ms waiting for the cat to load", after_ms)
            }
            FailureReason::MediaLoad { message } => write!(f, "failed to load cat GIF: {}", message),
            FailureReason::Superseded => write!(f, "superseded by a newer request"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    Success { alt_text: String },
    Failure { reason: FailureReason },
}

impl SwapOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SwapOutcome::Success { .. })
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, SwapOutcome::Failure { reason: FailureReason::Superseded })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusVariant {
    #[default]
    Info,
    Success,
    Error,
}

impl StatusVariant {
    pub fn label(&self) -> &'static str {
        match self {
            StatusVariant::Info => "info",
            StatusVariant::Success => "ok",
            StatusVariant::Error => "error",
        }
    }
}

/// The status line a front end shows under the image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    pub message: String,
    pub variant: StatusVariant,
    pub hidden: bool,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            message: String::new(),
            variant: StatusVariant::Info,
            hidden: true,
        }
    }
}

impl StatusLine {
    /// An empty message hides the line regardless of variant.
    pub fn apply(&mut self, message: &str, variant: StatusVariant) {
        if message.is_empty() {
            *self = Self::default();
            return;
        }
        self.message = message.to_owned();
        self.variant = variant;
        self.hidden = false;
    }
}

/// Inbound triggers raised by a front end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    RequestMedia(MediaRequest),
    Reset,
    Surprise,
    Retry,
    Quit,
}

/// Everything the orchestrator renders through.
#[async_trait]
pub trait CatView: Send + Sync {
    async fn render_loading(&self, loading: bool);
    async fn render_outcome(&self, outcome: &SwapOutcome);
    async fn render_status(&self, message: &str, variant: StatusVariant);
    async fn render_tag_options(&self, tags: &[String]);
    async fn set_form_enabled(&self, enabled: bool);
    async fn set_tag_loading(&self, loading: bool);
    async fn set_form_values(&self, request: &MediaRequest);
    async fn reset_form(&self);
}

/// Sending half of a load signal. Consuming `self` means an attempt can
/// settle at most once; dropping it unsettled reads as a load error.
#[derive(Debug)]
pub struct LoadNotifier {
    tx: oneshot::Sender<Result<(), String>>,
}

impl LoadNotifier {
    /// Returns `false` when nobody is waiting any more, e.g. the swap
    /// already timed out. The load must not be shown in that case.
    pub fn loaded(self) -> bool {
        self.tx.send(Ok(())).is_ok()
    }

    pub fn failed(self, message: impl Into<String>) -> bool {
        self.tx.send(Err(message.into())).is_ok()
    }

    /// Whether the receiving side has given up on this attempt.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half: resolves once the media either loads or errors.
#[derive(Debug)]
pub struct LoadSignal {
    rx: oneshot::Receiver<Result<(), String>>,
}

impl LoadSignal {
    pub fn channel() -> (LoadNotifier, LoadSignal) {
        let (tx, rx) = oneshot::channel();
        (LoadNotifier { tx }, LoadSignal { rx })
    }

    pub async fn settle(self) -> Result<(), String> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err("load abandoned before completion".to_owned()),
        }
    }
}

/// The visible slot media is loaded into.
#[async_trait]
pub trait MediaSurface: Send + Sync {
    /// Point the surface at `source` and start loading it. Any load still in
    /// flight on this surface is abandoned.
    ///
    /// A loaded frame may only be shown once [`LoadNotifier::loaded`] has
    /// reached a waiting receiver.
    async fn begin_load(&self, source: &Url) -> LoadSignal;

    /// Put a previously loaded source back on display (or clear the surface
    /// when there is none). Abandons any load in flight.
    async fn restore(&self, source: Option<&Url>);

    async fn set_alt_text(&self, alt_text: &str);

    async fn set_dimmed(&self, dimmed: bool);
}
