use crate::types::{CatView, FailureReason, MediaRequest, StatusLine, StatusVariant, SwapOutcome, ViewEvent};
use crate::utils::text::truncate_chars;
use async_trait::async_trait;
use std::io::Write;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const HELP: &str = "\
commands:
  cat [#tag] [caption]   fetch a cat (both optional; bare Enter resubmits the form)
  surprise               random mood and caption
  reset                  clear the form and fetch a plain cat
  retry                  fetch the last request again
  tags                   list available moods
  help                   show this help
  quit                   exit";

#[derive(Debug, Default)]
struct FormState {
    tag: String,
    caption: String,
    enabled: bool,
    tags_loading: bool,
}

struct ConsoleState {
    out: Box<dyn Write + Send>,
    status: StatusLine,
    tag_options: Vec<String>,
    form: FormState,
}

/// Line-oriented terminal front end.
pub struct ConsoleView {
    caption_max_chars: usize,
    state: Mutex<ConsoleState>,
}

impl ConsoleView {
    pub fn new(out: Box<dyn Write + Send>, caption_max_chars: usize) -> Self {
        Self {
            caption_max_chars,
            state: Mutex::new(ConsoleState {
                out,
                status: StatusLine::default(),
                tag_options: Vec::new(),
                form: FormState {
                    enabled: true,
                    ..FormState::default()
                },
            }),
        }
    }

    pub fn stdout(caption_max_chars: usize) -> Self {
        Self::new(Box::new(std::io::stdout()), caption_max_chars)
    }

    pub async fn status(&self) -> StatusLine {
        self.state.lock().await.status.clone()
    }

    pub async fn form_values(&self) -> MediaRequest {
        let state = self.state.lock().await;
        MediaRequest::new(&state.form.tag, &state.form.caption)
    }

    pub async fn tag_options(&self) -> Vec<String> {
        self.state.lock().await.tag_options.clone()
    }

    /// Turn one input line into a trigger. Informational commands are
    /// answered in place and yield `None`.
    pub async fn handle_line(&self, line: &str) -> Option<ViewEvent> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let mut state = self.state.lock().await;
        match command.to_ascii_lowercase().as_str() {
            "quit" | "exit" | "q" => return Some(ViewEvent::Quit),
            "help" | "?" => {
                state.print(HELP);
                return None;
            }
            "tags" => {
                let listing = if state.form.tags_loading {
                    "Loading moods… hold tight".to_string()
                } else if state.tag_options.is_empty() {
                    "No moods available.".to_string()
                } else {
                    state.tag_options.join(", ")
                };
                state.print(&listing);
                return None;
            }
            _ => {}
        }

        if !state.form.enabled {
            state.print("Still fetching a cat, hang on.");
            return None;
        }

        let event = match command.to_ascii_lowercase().as_str() {
            "" => ViewEvent::RequestMedia(MediaRequest::new(&state.form.tag, &state.form.caption)),
            "cat" | "c" => {
                let (tag, caption) = parse_request(rest);
                let caption = truncate_chars(&caption, self.caption_max_chars).to_string();
                state.form.tag = tag;
                state.form.caption = caption;
                ViewEvent::RequestMedia(MediaRequest::new(&state.form.tag, &state.form.caption))
            }
            "surprise" | "s" => ViewEvent::Surprise,
            "reset" => ViewEvent::Reset,
            "retry" | "r" => ViewEvent::Retry,
            other => {
                state.print(&format!("Unknown command `{}`. Type `help`.", other));
                return None;
            }
        };

        debug!("Console trigger: {:?}", event);
        Some(event)
    }
}

impl ConsoleState {
    fn print(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!("Failed to write to console: {}", e);
        }
    }
}

/// `#tag rest of caption`, `#tag`, or just a caption.
pub fn parse_request(input: &str) -> (String, String) {
    let input = input.trim();
    match input.strip_prefix('#') {
        Some(tagged) => match tagged.split_once(char::is_whitespace) {
            Some((tag, caption)) => (tag.to_string(), caption.trim().to_string()),
            None => (tagged.to_string(), String::new()),
        },
        None => (String::new(), input.to_string()),
    }
}

#[async_trait]
impl CatView for ConsoleView {
    async fn render_loading(&self, loading: bool) {
        if loading {
            self.state.lock().await.print("… fetching a cat");
        }
    }

    async fn render_outcome(&self, outcome: &SwapOutcome) {
        let line = match outcome {
            SwapOutcome::Success { alt_text } => format!("🐱 {}", alt_text),
            SwapOutcome::Failure { reason: FailureReason::Superseded } => return,
            SwapOutcome::Failure { reason } => format!("✗ {}", reason),
        };
        self.state.lock().await.print(&line);
    }

    async fn render_status(&self, message: &str, variant: StatusVariant) {
        let mut state = self.state.lock().await;
        state.status.apply(message, variant);
        if !state.status.hidden {
            let line = format!("[{}] {}", state.status.variant.label(), state.status.message);
            state.print(&line);
        }
    }

    async fn render_tag_options(&self, tags: &[String]) {
        let mut state = self.state.lock().await;
        state.tag_options = tags.to_vec();
        let line = format!("{} moods available (type `tags` to list them)", tags.len());
        state.print(&line);
    }

    async fn set_form_enabled(&self, enabled: bool) {
        self.state.lock().await.form.enabled = enabled;
    }

    async fn set_tag_loading(&self, loading: bool) {
        let mut state = self.state.lock().await;
        state.form.tags_loading = loading;
        if loading {
            state.print("Loading moods… hold tight");
        } else {
            let tip = format!(
                "Tip: combine a tag and a caption to craft unique, shareable loops. \
                 Captions are limited to {} characters to keep requests snappy.",
                self.caption_max_chars
            );
            state.print(&tip);
        }
    }

    async fn set_form_values(&self, request: &MediaRequest) {
        let mut state = self.state.lock().await;
        state.form.tag = request.tag().unwrap_or_default().to_string();
        state.form.caption = request.caption().unwrap_or_default().to_string();
    }

    async fn reset_form(&self) {
        let mut state = self.state.lock().await;
        state.form.tag.clear();
        state.form.caption.clear();
    }
}
