use anyhow::{Context, Result};
use clap::Parser;
use pdf_fetch::config::FetchConfig;
use pdf_fetch::core::{Bookmark, LoadState, PdfDocument, StatePublisher};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Download a PDF and report its load lifecycle, metadata and bookmarks
#[derive(Parser, Debug)]
#[command(name = "pdf-fetch", version, about)]
struct Cli {
    /// URL to load (defaults to the configured default URL)
    url: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the downloaded document to this file
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Do not print the bookmark tree
    #[arg(long)]
    no_bookmarks: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => FetchConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FetchConfig::default(),
    };
    debug!(?config, "Configuration");

    let publisher = StatePublisher::from_config(&config)?;
    let mut observer = publisher.observe();

    let url = cli.url.as_deref().unwrap_or(publisher.default_url()).to_string();
    publisher.load_pdf(Some(&url));

    while let Some(state) = observer.next().await {
        match state {
            LoadState::Idle => debug!("Idle"),
            LoadState::Loading => info!(url = %url, "Loading"),
            LoadState::Error(reason) => {
                let reason = reason.as_deref().unwrap_or("unknown error");
                error!(url = %url, reason, "Load failed");
                eprintln!("Error: {}", reason);
                return Ok(ExitCode::FAILURE);
            }
            LoadState::Success(handoff) => {
                let Some(stream) = handoff.take() else {
                    warn!("Document stream already claimed");
                    continue;
                };
                let source = stream.source().to_string();
                let data = stream
                    .read_to_end()
                    .await
                    .with_context(|| format!("reading body of {}", source))?;
                info!(bytes = data.len(), "Download complete");

                if let Some(path) = &cli.save {
                    std::fs::write(path, &data)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "Saved document");
                }

                let doc = PdfDocument::load(&data, &config.viewer)
                    .with_context(|| format!("opening document from {}", source))?;
                report(&doc, !cli.no_bookmarks)?;
                return Ok(ExitCode::SUCCESS);
            }
        }
    }

    error!("Session ended before the load finished");
    Ok(ExitCode::FAILURE)
}

/// Prints what a viewer would show once the document is open.
fn report(doc: &PdfDocument, show_bookmarks: bool) -> Result<()> {
    let options = doc.options();
    debug!(
        antialiasing = options.antialiasing,
        auto_spacing = options.auto_spacing,
        fit_policy = ?options.fit_policy,
        fit_each_page = options.fit_each_page,
        page_snap = options.page_snap,
        page_fling = options.page_fling,
        night_mode = options.night_mode,
        "Viewer options"
    );

    println!(
        "PDF {} with {} page(s), opening at page {}",
        doc.version(),
        doc.page_count(),
        doc.start_page()
    );

    for (label, value) in doc.metadata().entries() {
        println!("{} = {}", label, value.unwrap_or(""));
    }

    if show_bookmarks {
        let bookmarks = doc.bookmarks()?;
        if bookmarks.is_empty() {
            println!("No bookmarks");
        }
        for line in Bookmark::tree_lines(&bookmarks, "-") {
            println!("{}", line);
        }
    }

    Ok(())
}
