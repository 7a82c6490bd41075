// src/main.rs

//! # mdpreview entry point
//!
//! Parses flags, loads configuration, sets up logging, and runs one of the
//! three modes: print to stdout, open a one-off page, or watch and live-reload.

use anyhow::{Context, Result};
use clap::Parser;
use mdpreview::artifact::ArtifactStore;
use mdpreview::browser;
use mdpreview::config::{AppConfig, CliArgs, Mode};
use mdpreview::debounce::Debouncer;
use mdpreview::error::PreviewError;
use mdpreview::fanout::UpdateFanout;
use mdpreview::highlight;
use mdpreview::lifecycle::Lifecycle;
use mdpreview::observer::{Observer, TracingObserver};
use mdpreview::render::{MarkdownRenderer, PageRenderer, Render};
use mdpreview::watcher::{self, WatchedPath};
use mdpreview::web::{self, AppState};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// How long the web server gets to drain after the session ends.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match CliArgs::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not usage errors.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let app_config = match AppConfig::load(cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            if matches!(e, PreviewError::Usage(_)) {
                eprintln!("Run `mdpreview --help` for usage.");
            }
            return e.exit_code();
        }
    };

    // Log to stderr so stdout stays clean for rendered output.
    let filter = if app_config.verbose {
        EnvFilter::try_new(&app_config.log_level)
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&app_config.log_level))
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Setting default tracing subscriber failed");

    tracing::debug!("mdpreview starting with configuration: {:?}", app_config);

    match run(&app_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<PreviewError>()
                .map_or(ExitCode::FAILURE, PreviewError::exit_code)
        }
    }
}

async fn run(app_config: &AppConfig) -> Result<()> {
    let markdown = MarkdownRenderer::new(highlight::resolve(app_config.pygmentize.as_deref()));

    match app_config.mode {
        Mode::Stdout => {
            let document = read_input(app_config.file.as_deref()).await?;
            let html = markdown.render(&document);
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&html).await?;
            stdout.flush().await?;
        }
        Mode::Serve => {
            let document = read_input(app_config.file.as_deref()).await?;
            let page = PageRenderer::new(markdown).render(&document);
            tokio::fs::write(&app_config.temp_file, page)
                .await
                .with_context(|| {
                    format!("could not write {}", app_config.temp_file.display())
                })?;
            browser::open(
                &app_config.open_command,
                &app_config.temp_file.to_string_lossy(),
            )
            .await?;
        }
        Mode::Watch => run_watch(app_config, markdown).await?,
    }
    Ok(())
}

/// Reads the document from `file`, or from stdin when there is none.
async fn read_input(file: Option<&Path>) -> Result<Vec<u8>, PreviewError> {
    match file {
        Some(path) => tokio::fs::read(path)
            .await
            .map_err(|source| PreviewError::Read {
                path: path.to_path_buf(),
                source,
            }),
        None => {
            let mut document = Vec::new();
            tokio::io::stdin().read_to_end(&mut document).await?;
            Ok(document)
        }
    }
}

/// Serves the document with live reload until the viewer closes the tab or
/// Ctrl-C is pressed.
async fn run_watch(app_config: &AppConfig, markdown: MarkdownRenderer) -> Result<()> {
    let file = app_config
        .file
        .as_deref()
        .context("watch mode needs a file")?;
    let watched = WatchedPath::new(file)?;
    let observer: Arc<dyn Observer> = Arc::new(TracingObserver);

    // Watch before the first read so no save slips between the two.
    let events = watcher::start(watched.clone(), Arc::clone(&observer))?;

    let renderer: Arc<dyn Render> = Arc::new(PageRenderer::new(markdown));
    let initial = renderer.render(&read_input(Some(watched.resolved())).await?);

    let store = ArtifactStore::new(initial);
    let fanout = UpdateFanout::new();
    let lifecycle = Lifecycle::new();

    let debouncer = Debouncer::new(
        watched.resolved(),
        renderer,
        store.clone(),
        fanout.clone(),
        observer,
    )
    .with_window(app_config.debounce);
    tokio::spawn(debouncer.run(events));

    let state =
        AppState::new(store, fanout, lifecycle.clone()).with_keep_alive(app_config.keep_alive);
    let server = web::start_server(state).await?;
    let url = server.url().to_string();
    tracing::info!("Serving markdown rendered from {} at {}", file.display(), url);

    // A cold-started browser keeps the open command running; the session
    // may end before it returns.
    let opener = browser::open(&app_config.open_command, &url);
    tokio::pin!(opener);
    let mut opening = true;
    let mut listening_for_ctrl_c = true;
    let mut session = lifecycle.signal();
    loop {
        tokio::select! {
            _ = session.wait() => break,
            opened = &mut opener, if opening => {
                opening = false;
                if let Err(e) = opened {
                    lifecycle.end_session();
                    return Err(e.into());
                }
            }
            res = tokio::signal::ctrl_c(), if listening_for_ctrl_c => match res {
                Ok(()) => {
                    tracing::info!("Ctrl-C received, initiating shutdown...");
                    lifecycle.end_session();
                    break;
                }
                Err(err) => {
                    tracing::error!("Failed to listen for Ctrl-C signal: {}", err);
                    listening_for_ctrl_c = false;
                }
            }
        }
    }

    if tokio::time::timeout(SHUTDOWN_GRACE, server.stopped())
        .await
        .is_err()
    {
        tracing::warn!("Web server did not stop within {:?}", SHUTDOWN_GRACE);
    }
    tracing::info!("mdpreview shut down.");
    Ok(())
}
