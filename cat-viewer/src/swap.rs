use crate::types::{FailureReason, MediaSurface, SwapOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// State of the one visible media slot.
///
/// `last_known_good_source` only ever holds a source that finished loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSlot {
    pub current_source: Option<Url>,
    pub last_known_good_source: Option<Url>,
    pub is_loading: bool,
    pub alt_text: String,
    /// Token of the most recently started swap.
    pub latest_attempt: u64,
}

/// Swaps the media shown on a surface, rolling back to the last good source
/// when a load fails or times out.
///
/// Every call to [`swap`](Self::swap) takes a fresh, strictly increasing
/// attempt token. A terminal signal only touches the slot when its token is
/// still the latest one, so an older attempt that settles late can never
/// overwrite the state of a newer one. Starting a new swap is the only way
/// to cancel an in-flight one.
pub struct MediaSwapController {
    surface: Arc<dyn MediaSurface>,
    slot: RwLock<MediaSlot>,
}

enum Settled {
    Loaded,
    Errored(String),
    TimedOut,
}

impl MediaSwapController {
    pub fn new(surface: Arc<dyn MediaSurface>) -> Self {
        Self {
            surface,
            slot: RwLock::new(MediaSlot::default()),
        }
    }

    pub async fn snapshot(&self) -> MediaSlot {
        self.slot.read().await.clone()
    }

    /// Load `new_source` into the slot. Never fails past this boundary:
    /// every error path resolves to a [`SwapOutcome::Failure`].
    pub async fn swap(&self, new_source: Url, alt_text: &str, timeout: Duration) -> SwapOutcome {
        let (token, signal) = {
            let mut slot = self.slot.write().await;
            slot.latest_attempt += 1;
            slot.is_loading = true;
            let token = slot.latest_attempt;

            // Pointing the surface happens under the lock so surface order
            // always matches token order.
            self.surface.set_dimmed(true).await;
            let signal = self.surface.begin_load(&new_source).await;
            (token, signal)
        };

        debug!("Swap #{} started for {}", token, new_source);

        // Whichever branch loses is dropped here, which cancels the timer or
        // closes the signal so neither can fire later.
        let settled = match tokio::time::timeout(timeout, signal.settle()).await {
            Ok(Ok(())) => Settled::Loaded,
            Ok(Err(message)) => Settled::Errored(message),
            Err(_) => Settled::TimedOut,
        };

        let mut slot = self.slot.write().await;
        if slot.latest_attempt != token {
            debug!(
                "Ignoring settled swap #{} for {}; #{} is current",
                token, new_source, slot.latest_attempt
            );
            return SwapOutcome::Failure {
                reason: FailureReason::Superseded,
            };
        }

        slot.is_loading = false;
        match settled {
            Settled::Loaded => {
                slot.current_source = Some(new_source.clone());
                slot.last_known_good_source = Some(new_source.clone());
                slot.alt_text = alt_text.to_string();
                self.surface.set_alt_text(alt_text).await;
                self.surface.set_dimmed(false).await;

                info!("Swap #{} loaded {}", token, new_source);
                SwapOutcome::Success {
                    alt_text: alt_text.to_string(),
                }
            }
            Settled::Errored(message) => {
                warn!("Swap #{} failed for {}: {}", token, new_source, message);
                self.roll_back(&mut slot).await;
                SwapOutcome::Failure {
                    reason: FailureReason::MediaLoad { message },
                }
            }
            Settled::TimedOut => {
                let after_ms = timeout.as_millis() as u64;
                warn!("Swap #{} timed out after {}ms for {}", token, after_ms, new_source);
                self.roll_back(&mut slot).await;
                SwapOutcome::Failure {
                    reason: FailureReason::Timeout { after_ms },
                }
            }
        }
    }

    async fn roll_back(&self, slot: &mut MediaSlot) {
        let fallback = slot.last_known_good_source.clone();
        match &fallback {
            Some(source) => debug!("Rolling back to {}", source),
            None => debug!("Nothing to roll back to; clearing the surface"),
        }
        self.surface.restore(fallback.as_ref()).await;
        self.surface.set_dimmed(false).await;
        slot.current_source = fallback;
    }
}
