//! photoenh - command-line front end for the photo enhancement service
//!
//! Each invocation behaves like one page load: the controller bootstraps from
//! the local pending-photo cache or the server photo list, then runs the
//! requested action.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use photoenh_client::api::{BackendClient, PaidPhoto};
use photoenh_client::download::{DownloadBatch, FsDownloader};
use photoenh_client::reconcile::{AuthTrigger, Collaborators, ReadinessGate, UploadContext};
use photoenh_client::selection::{format_amount, DownloadOutcome, PaymentGate};
use photoenh_client::session_store::{FileKeyValueStore, SessionStore};
use photoenh_client::upload::{UploadFile, UploadPipeline};
use photoenh_client::view::TerminalView;
use photoenh_client::PhotoSessionController;
use photoenh_common::config::{ClientConfig, ConfigOverrides};
use photoenh_common::events::{EventBus, UploadEvent};
use photoenh_common::models::{ChangeIntensity, DetailLevel, EnhanceSettings};
use photoenh_common::PhotoId;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "photoenh")]
#[command(about = "Enhance photos and manage downloads")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/photoenh/config.toml)
    #[arg(long, global = true, env = "PHOTOENH_CONFIG")]
    config: Option<PathBuf>,

    /// Backend origin
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory holding the pending-photo cache
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Directory enhanced images are saved into
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload images for enhancement
    Enhance {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Use night conversion instead of standard enhancement
        #[arg(long)]
        night: bool,

        #[arg(long, value_enum, default_value_t = Intensity::Moderate)]
        intensity: Intensity,

        #[arg(long, value_enum, default_value_t = Detail::Moderate)]
        detail_level: Detail,

        /// Signed-in upload: refresh the saved photo list instead of caching locally
        #[arg(long)]
        dashboard: bool,
    },
    /// Show pending or saved photos
    List {
        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// Download photos, paying first if required
    Download {
        /// Download every displayed photo
        #[arg(long, conflicts_with = "pick")]
        all: bool,

        /// 1-based positions to download, e.g. 1,3
        #[arg(long, value_delimiter = ',')]
        pick: Vec<usize>,

        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// Download photos after a completed checkout
    Paid {
        /// ID:ENHANCED_FILENAME, e.g. 12:enhanced_beach.jpg
        #[arg(long = "photo", required = true)]
        photos: Vec<String>,
    },
    /// Delete a saved photo
    Delete {
        id: i64,

        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// Re-check sign-in status
    Auth,
    /// Show account statistics
    Stats,
    /// Forget pending photos
    Clear,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Intensity {
    Subtle,
    Moderate,
    Strong,
}

impl From<Intensity> for ChangeIntensity {
    fn from(value: Intensity) -> Self {
        match value {
            Intensity::Subtle => ChangeIntensity::Subtle,
            Intensity::Moderate => ChangeIntensity::Moderate,
            Intensity::Strong => ChangeIntensity::Strong,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Detail {
    Minimal,
    Moderate,
    Extensive,
}

impl From<Detail> for DetailLevel {
    fn from(value: Detail) -> Self {
        match value {
            Detail::Minimal => DetailLevel::Minimal,
            Detail::Moderate => DetailLevel::Moderate,
            Detail::Extensive => DetailLevel::Extensive,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        config_file: args.config.clone(),
        base_url: args.base_url.clone(),
        state_dir: args.state_dir.clone(),
        download_dir: args.download_dir.clone(),
        night_mode: None,
    };
    let config = ClientConfig::resolve(&overrides).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting photoenh v{} against {}",
        env!("CARGO_PKG_VERSION"),
        config.base_url
    );

    let client = Arc::new(BackendClient::from_config(&config)?);
    let store = SessionStore::new(Arc::new(FileKeyValueStore::new(config.store_path())));
    let downloader = Arc::new(FsDownloader::new(&config.download_dir, client.clone()));
    let gate = PaymentGate::new(
        client.clone(),
        downloader,
        Duration::from_millis(config.download_stagger_ms),
        Duration::from_millis(config.paid_download_stagger_ms),
    );
    let events = EventBus::default();
    spawn_progress_printer(&events);

    let ready = ReadinessGate::new();
    let mut controller = PhotoSessionController::new(
        store.clone(),
        Collaborators {
            photos: client.clone(),
            account: client.clone(),
            gate,
            pipeline: UploadPipeline::new(client.clone(), events),
            view: Arc::new(TerminalView),
        },
        config.page_size,
        ready.clone(),
    );
    // Terminal output is available as soon as the view exists
    ready.signal();

    match args.command {
        Command::Enhance {
            files,
            night,
            intensity,
            detail_level,
            dashboard,
        } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let file = UploadFile::from_path(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                uploads.push(file);
            }

            let settings = EnhanceSettings {
                change_intensity: intensity.into(),
                detail_level: detail_level.into(),
                night_mode: night || config.night_mode,
            };
            let context = if dashboard {
                UploadContext::Dashboard
            } else {
                UploadContext::Landing
            };

            let batch = controller.upload(uploads, &settings, context).await;
            println!("{} enhanced, {} failed", batch.succeeded(), batch.failed());
        }
        Command::List { page } => {
            controller.bootstrap().await;
            if page != 1 {
                controller.navigate(page).await?;
            }
        }
        Command::Download { all, pick, page } => {
            controller.bootstrap().await;
            if page != 1 {
                controller.navigate(page).await?;
            }

            let outcome = if all {
                controller.download_all().await?
            } else {
                for position in pick {
                    if position == 0 {
                        return Err(anyhow!("Positions start at 1"));
                    }
                    controller.toggle(position - 1);
                }
                println!("Total: ${}", format_amount(controller.charge()));
                controller.request_download().await?
            };

            if let DownloadOutcome::Started(batch) = outcome {
                report(batch).await;
            }
        }
        Command::Paid { photos } => {
            let paid = photos
                .iter()
                .map(|raw| parse_paid_photo(raw))
                .collect::<Result<Vec<_>>>()?;
            report(controller.download_paid(&paid)).await;
        }
        Command::Delete { id, page } => {
            controller.bootstrap().await;
            if page != 1 {
                controller.navigate(page).await?;
            }
            controller.delete_photo(PhotoId(id)).await?;
        }
        Command::Auth => {
            controller.bootstrap().await;
            let authenticated = controller.on_auth_check(AuthTrigger::FocusRegained).await;
            println!("{}", if authenticated { "Signed in" } else { "Signed out" });
        }
        Command::Stats => {
            controller.refresh_stats().await;
        }
        Command::Clear => {
            store.clear();
            println!("Pending photos cleared");
        }
    }

    Ok(())
}

/// Print live per-file progress from the upload event stream
fn spawn_progress_printer(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(UploadEvent::FileProgress {
                    index,
                    file_name,
                    percent,
                    status_text,
                    ..
                }) => println!("[{}] {:>3}%  {}  {}", index + 1, percent, file_name, status_text),
                Ok(UploadEvent::FileFailed { file_name, error, .. }) => {
                    println!("      {}  Error: {}", file_name, error)
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Progress output fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn report(batch: DownloadBatch) {
    for report in batch.join().await {
        match report.result {
            Ok(path) => println!("Saved {}", path.display()),
            Err(error) => println!(
                "Could not save {} ({}); open {} manually",
                report.item.file_name, error, report.item.source
            ),
        }
    }
}

fn parse_paid_photo(raw: &str) -> Result<PaidPhoto> {
    let (id, name) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected ID:ENHANCED_FILENAME, got {}", raw))?;
    let id: i64 = id
        .trim()
        .parse()
        .with_context(|| format!("Invalid photo id in {}", raw))?;
    Ok(PaidPhoto {
        id: PhotoId(id),
        enhanced_filename: name.trim().to_string(),
    })
}
