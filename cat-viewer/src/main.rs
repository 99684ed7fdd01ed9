use anyhow::Context;
use cat_viewer::bootstrap::{register_services, ORCHESTRATOR, SURFACE, VIEW};
use cat_viewer::console::HELP;
use cat_viewer::utils::text::truncate_chars;
use cat_viewer::{
    CatView, ConsoleView, HttpMediaSurface, MediaRequest, MediaSurface, Orchestrator,
    ServiceContainer, SwapOutcome, ViewEvent, ViewerConfig, ViewerError,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fetch random cat GIFs from Cat as a Service
#[derive(Parser, Debug)]
#[command(name = "cat-viewer")]
#[command(about = "Fetch random cat GIFs, filtered by mood and captioned", long_about = None)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// API root
    #[arg(long)]
    base_url: Option<String>,

    /// How long a single GIF may take to load
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// HTTP timeout for individual requests
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    #[arg(long)]
    user_agent: Option<String>,

    /// Write every successfully loaded GIF to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Mood tag for the first cat
    #[arg(short, long, default_value = "")]
    tag: String,

    /// Caption for the first cat
    #[arg(short, long, default_value = "")]
    caption: String,

    /// Load one cat and exit; the exit code reflects the outcome
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => ViewerConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.swap_timeout_ms = timeout_ms;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_seconds = secs;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    info!("Using cat API at {}", config.base_url);

    let view = Arc::new(ConsoleView::stdout(config.caption_max_chars));
    let surface = Arc::new(HttpMediaSurface::new(&config, cli.output.clone())?);

    let mut container = ServiceContainer::new();
    {
        let view = view.clone();
        container.register::<dyn CatView, _>(VIEW, move |_| Ok(view.clone()))?;
    }
    {
        let surface = surface.clone();
        container.register::<dyn MediaSurface, _>(SURFACE, move |_| Ok(surface.clone()))?;
    }
    register_services(&mut container, config.clone())?;
    let orchestrator = container.get::<Orchestrator>(ORCHESTRATOR)?;

    let caption = truncate_chars(cli.caption.trim(), config.caption_max_chars);
    let outcome = orchestrator.init_with(MediaRequest::new(&cli.tag, caption)).await;

    if cli.once {
        return match outcome {
            SwapOutcome::Success { .. } => {
                surface.flush_output().await.context("could not write the cat")?;
                Ok(())
            }
            SwapOutcome::Failure { reason } => {
                Err(ViewerError::from(reason)).context("could not load a cat")
            }
        };
    }

    println!("{}", HELP);

    let (tx, rx) = mpsc::channel(16);
    let reader_view = view.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let event = match lines.next_line().await {
                Ok(Some(line)) => match reader_view.handle_line(&line).await {
                    Some(event) => event,
                    None => continue,
                },
                Ok(None) => ViewEvent::Quit,
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    ViewEvent::Quit
                }
            };

            let quit = event == ViewEvent::Quit;
            if tx.send(event).await.is_err() || quit {
                break;
            }
        }
    });

    orchestrator.run(rx).await;
    surface.flush_output().await?;
    info!("Goodbye");
    Ok(())
}
