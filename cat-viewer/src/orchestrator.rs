use crate::surprise::{pick_random_caption, pick_random_tag};
use crate::swap::MediaSwapController;
use crate::traits::{CatService, RandomSource};
use crate::types::{CatView, MediaRequest, StatusVariant, SwapOutcome, ViewEvent};
use crate::utils::{build_alt_text, build_status_message};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

pub const TAGS_UNAVAILABLE_MESSAGE: &str =
    "Tag suggestions are snoozing right now. You can still fetch random cats!";
pub const LOAD_FAILED_MESSAGE: &str =
    "We could not load a cat right now. Please try again in a few seconds.";

/// Wires the cat service, the swap controller and the view together.
pub struct Orchestrator {
    cat_service: Arc<dyn CatService>,
    view: Arc<dyn CatView>,
    controller: Arc<MediaSwapController>,
    random: Arc<dyn RandomSource>,
    swap_timeout: Duration,
    available_tags: RwLock<Vec<String>>,
    last_request: RwLock<MediaRequest>,
}

impl Orchestrator {
    pub fn new(
        cat_service: Arc<dyn CatService>,
        view: Arc<dyn CatView>,
        controller: Arc<MediaSwapController>,
        random: Arc<dyn RandomSource>,
        swap_timeout: Duration,
    ) -> Self {
        Self {
            cat_service,
            view,
            controller,
            random,
            swap_timeout,
            available_tags: RwLock::new(Vec::new()),
            last_request: RwLock::new(MediaRequest::empty()),
        }
    }

    pub fn controller(&self) -> &Arc<MediaSwapController> {
        &self.controller
    }

    pub async fn available_tags(&self) -> Vec<String> {
        self.available_tags.read().await.clone()
    }

    /// Startup: tags first (best effort), then one plain cat.
    pub async fn init(&self) -> SwapOutcome {
        self.init_with(MediaRequest::empty()).await
    }

    /// Startup with a caller-chosen first request.
    pub async fn init_with(&self, request: MediaRequest) -> SwapOutcome {
        info!("Starting cat viewer");
        self.load_tags().await;
        if !request.is_empty() {
            self.view.set_form_values(&request).await;
        }
        self.load(request).await
    }

    pub async fn load_tags(&self) {
        self.view.set_tag_loading(true).await;
        match self.cat_service.list_tags().await {
            Ok(tags) => {
                self.view.render_tag_options(&tags).await;
                // Replaced wholesale, never patched.
                *self.available_tags.write().await = tags;
            }
            Err(e) => {
                warn!("Failed to load cat tags: {}", e);
                self.view
                    .render_status(TAGS_UNAVAILABLE_MESSAGE, StatusVariant::Info)
                    .await;
            }
        }
        self.view.set_tag_loading(false).await;
    }

    pub async fn load(&self, request: MediaRequest) -> SwapOutcome {
        *self.last_request.write().await = request.clone();

        self.view.set_form_enabled(false).await;
        self.view.render_loading(true).await;
        self.view.render_status("", StatusVariant::Info).await;

        let url = self.cat_service.build_gif_url(&request);
        let alt_text = build_alt_text(&request);
        info!("Requesting cat GIF {}", url);

        let outcome = self.controller.swap(url, &alt_text, self.swap_timeout).await;
        if outcome.is_superseded() {
            // The newer load owns the view now.
            debug!("Load for {:?} was superseded", request);
            return outcome;
        }

        self.view.render_loading(false).await;
        self.view.render_outcome(&outcome).await;
        match &outcome {
            SwapOutcome::Success { .. } => {
                self.view
                    .render_status(&build_status_message(&request), StatusVariant::Success)
                    .await;
            }
            SwapOutcome::Failure { reason } => {
                error!("Unable to load cat GIF: {}", reason);
                self.view
                    .render_status(LOAD_FAILED_MESSAGE, StatusVariant::Error)
                    .await;
            }
        }
        self.view.set_form_enabled(true).await;
        outcome
    }

    pub async fn handle_reset(&self) -> SwapOutcome {
        self.view.reset_form().await;
        self.view.render_status("", StatusVariant::Info).await;
        self.load(MediaRequest::empty()).await
    }

    pub async fn handle_surprise(&self) -> SwapOutcome {
        let tag = {
            let tags = self.available_tags.read().await;
            pick_random_tag(self.random.as_ref(), &tags)
        };
        let caption = pick_random_caption(self.random.as_ref());
        let request = MediaRequest::new(tag, caption);
        self.view.set_form_values(&request).await;
        self.load(request).await
    }

    /// Reload the previous request; the URL is rebuilt so it is never a cache hit.
    pub async fn handle_retry(&self) -> SwapOutcome {
        let request = self.last_request.read().await.clone();
        self.load(request).await
    }

    /// Dispatch one trigger. `Quit` yields `None`.
    pub async fn handle(&self, event: ViewEvent) -> Option<SwapOutcome> {
        let outcome = match event {
            ViewEvent::RequestMedia(request) => self.load(request).await,
            ViewEvent::Reset => self.handle_reset().await,
            ViewEvent::Surprise => self.handle_surprise().await,
            ViewEvent::Retry => self.handle_retry().await,
            ViewEvent::Quit => return None,
        };
        Some(outcome)
    }

    /// Drain triggers until `Quit` or the sender goes away. Each load runs in
    /// its own task so a newer trigger can supersede one still in flight.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<ViewEvent>) {
        while let Some(event) = events.recv().await {
            if event == ViewEvent::Quit {
                info!("Quit requested");
                break;
            }
            let this = self.clone();
            tokio::spawn(async move {
                this.handle(event).await;
            });
        }
    }
}
