use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doctext::api::{create_router, AppState};
use doctext::config::Config;
use doctext::error::DoctextError;
use doctext::processing::{
    BarProgress, BatchDriver, ContentExtractor, LogProgress, ProgressReporter,
};

#[derive(Parser)]
#[command(name = "doctext")]
#[command(about = "Extract plain text from PDF, DOCX and XLSX documents")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract every file in the input directory (default)
    Extract {
        /// Directory to read documents from
        #[arg(long)]
        input: Option<PathBuf>,
        /// Directory to write text files to
        #[arg(long)]
        output: Option<PathBuf>,
        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },
    /// Serve the upload page and extraction API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doctext=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();

    match args.command.unwrap_or(Command::Extract {
        input: None,
        output: None,
        progress: false,
    }) {
        Command::Extract {
            input,
            output,
            progress,
        } => {
            if let Some(input) = input {
                config.batch.input_dir = input;
            }
            if let Some(output) = output {
                config.batch.output_dir = output;
            }
            run_batch(config, progress).await
        }
        Command::Serve => serve(config).await,
    }
}

async fn run_batch(config: Config, progress: bool) -> anyhow::Result<()> {
    tracing::info!("Starting document extraction...");

    let output_dir = config.batch.output_dir.clone();
    let report = tokio::task::spawn_blocking(move || {
        let mut extractor = ContentExtractor::from_config(&config);
        let mut driver_progress: Option<Arc<dyn ProgressReporter>> = None;
        if progress {
            // The bar tracks files; pages are reported at debug level
            extractor = extractor.with_progress(Arc::new(LogProgress::default()));
            driver_progress = Some(Arc::new(BarProgress::new()));
        }

        let mut driver = BatchDriver::new(Arc::new(extractor), config.batch);
        if let Some(reporter) = driver_progress {
            driver = driver.with_progress(reporter);
        }
        driver.run()
    })
    .await?;

    match report {
        Ok(report) => {
            tracing::info!(
                "All files processed. Output saved to '{}/' ({} written, {} skipped, {} empty, {} failed).",
                output_dir.display(),
                report.written(),
                report.skipped(),
                report.empty(),
                report.failed()
            );
        }
        // A missing input directory is reported, not treated as a process failure
        Err(e @ DoctextError::InputDirMissing(_)) => tracing::error!("{}", e),
        Err(e) => tracing::error!("Batch aborted: {}", e),
    }

    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Initializing OCR provider ({})...", config.ocr.languages);
    let extractor = ContentExtractor::from_config(&config);
    if !extractor.ocr_available() {
        tracing::warn!("OCR unavailable - scanned PDF pages will fail to extract");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_router(AppState::new(config, extractor));

    tracing::info!("Doctext starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
