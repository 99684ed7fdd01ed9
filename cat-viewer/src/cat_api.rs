use crate::traits::CatService;
use crate::types::{MediaRequest, Result, ViewerConfig, ViewerError};
use crate::utils::sort_tags;
use async_trait::async_trait;
use chrono::Utc;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Characters left alone by `encodeURIComponent`; everything else is escaped.
pub const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Client for the Cat as a Service API.
///
/// URL composition is pure so callers can swap the displayed source without
/// waiting on the network; only the tag catalog needs a request.
pub struct CatApi {
    client: Client,
    base_url: Url,
    base_path: String,
    last_timestamp: AtomicI64,
}

impl CatApi {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Self::with_client(client, &config.base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ViewerError::General(format!("Base URL cannot carry a path: {}", base_url)));
        }
        base_url.set_query(None);
        base_url.set_fragment(None);
        let base_path = base_url.path().trim_end_matches('/').to_string();

        debug!("Cat API rooted at {}", base_url);

        Ok(Self {
            client,
            base_url,
            base_path,
            last_timestamp: AtomicI64::new(0),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn build_gif_url(&self, request: &MediaRequest) -> Url {
        // "." and ".." would be collapsed as dot segments by URL
        // normalisation, so they cannot travel as a caption.
        let caption = request.caption().filter(|c| !matches!(*c, "." | ".."));
        let path = match caption {
            Some(caption) => format!(
                "{}/cat/gif/says/{}",
                self.base_path,
                utf8_percent_encode(caption, COMPONENT)
            ),
            None => format!("{}/cat/gif", self.base_path),
        };

        let mut url = self.base_url.clone();
        url.set_path(&path);
        {
            let mut query = url.query_pairs_mut();
            if let Some(tag) = request.tag() {
                query.append_pair("tag", tag);
            }
            query.append_pair("timestamp", &self.next_timestamp().to_string());
        }
        url
    }

    pub async fn list_tags(&self) -> Result<Vec<String>> {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}/api/tags", self.base_path));

        debug!("Fetching tag catalog from {}", url);

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Tag catalog request failed with HTTP {}", status);
            return Err(ViewerError::Fetch { status: status.as_u16() });
        }

        let body = response.text().await?;
        let raw: Option<Vec<Value>> = serde_json::from_str(&body)?;
        let tags = normalize_tags(raw.unwrap_or_default());

        info!("Fetched {} tags", tags.len());
        Ok(tags)
    }

    /// Epoch milliseconds, bumped past the previous value when the clock
    /// has not moved so consecutive URLs always differ.
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

#[async_trait]
impl CatService for CatApi {
    fn build_gif_url(&self, request: &MediaRequest) -> Url {
        CatApi::build_gif_url(self, request)
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        CatApi::list_tags(self).await
    }
}

/// Trim, drop empties and sort. Duplicates pass through untouched.
pub fn normalize_tags(raw: Vec<Value>) -> Vec<String> {
    let mut tags: Vec<String> = raw
        .into_iter()
        .map(|value| match value {
            Value::String(s) => s.trim().to_string(),
            Value::Null => String::new(),
            other => other.to_string().trim().to_string(),
        })
        .filter(|tag| !tag.is_empty())
        .collect();

    sort_tags(&mut tags);
    tags
}
