use serde::{Deserialize, Serialize};
// Use the interfaces crate for core types
pub use interfaces::defs::{MediaRequest, SwapOutcome, FailureReason, StatusVariant, StatusLine, ViewEvent, CAPTION_MAX_CHARS};
pub use interfaces::defs::{CatView, MediaSurface, LoadSignal, LoadNotifier};

pub const DEFAULT_BASE_URL: &str = "https://cataas.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_seconds: u64,
    pub swap_timeout_ms: u64,
    pub caption_max_chars: usize,
    pub max_media_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: "Cat-Viewer/1.0".to_string(),
            request_timeout_seconds: 30,
            swap_timeout_ms: 30_000,
            caption_max_chars: CAPTION_MAX_CHARS,
            max_media_size_mb: 20,
            max_redirects: 5,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("Service \"{key}\" is already registered")]
    AlreadyRegistered { key: String },

    #[error("Missing service registration for \"{key}\"")]
    Missing { key: String },

    #[error("Service \"{key}\" is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Service \"{key}\" depends on itself")]
    Cycle { key: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("Failed to fetch tags: HTTP {status}")]
    Fetch { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Media load error: {0}")]
    MediaLoad(String),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, ViewerError>;

impl From<FailureReason> for ViewerError {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::Timeout { after_ms } => ViewerError::Timeout { after_ms },
            FailureReason::MediaLoad { message } => ViewerError::MediaLoad(message),
            FailureReason::Superseded => ViewerError::General(reason.to_string()),
        }
    }
}
