use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use client::config::ClientConfig;
use client::{HttpBackend, UploadCoordinator, UploadForm, UploadStage, VideoFile};

/// Upload a video, register it and wait until it is ready to stream.
#[derive(Parser)]
#[command(name = "toonstream-upload", version)]
struct Cli {
    /// Video file to upload
    file: PathBuf,

    #[arg(short, long)]
    title: String,

    #[arg(short, long)]
    description: String,

    /// Config file (without extension)
    #[arg(short, long, env = "TOONSTREAM_CLIENT_CONFIG")]
    config: Option<String>,

    /// Override the catalog service URL
    #[arg(long)]
    server_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config =
        ClientConfig::load(cli.config.as_deref()).context("Failed to load client configuration")?;
    if let Some(url) = cli.server_url {
        config.server.url = url;
    }

    let bytes = tokio::fs::read(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let file_name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let coordinator = UploadCoordinator::new(
        Arc::new(HttpBackend::new(&config)),
        config.polling.policy(),
    );
    let mut rx = coordinator.subscribe();

    let form = UploadForm {
        title: cli.title,
        description: cli.description,
        file: Some(VideoFile { file_name, bytes }),
    };

    tokio::select! {
        result = run(&coordinator, &mut rx, form) => result,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the coordinator cancels polling.
            info!("Interrupted");
            Ok(())
        }
    }
}

async fn run(
    coordinator: &UploadCoordinator<HttpBackend>,
    rx: &mut tokio::sync::watch::Receiver<client::Snapshot>,
    form: UploadForm,
) -> anyhow::Result<()> {
    let mut last_stage = UploadStage::Idle;
    let public_id = coordinator.submit(form).await?;
    println!("Uploaded {public_id}, waiting for transcoding");

    loop {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.stage != last_stage {
            println!("{} -> {}", last_stage, snapshot.stage);
            last_stage = snapshot.stage;
        }
        match (snapshot.stage, snapshot.notice) {
            (UploadStage::Ready, _) => {
                println!("{public_id} is ready");
                return Ok(());
            }
            (UploadStage::Idle, Some(notice)) | (UploadStage::Processing, Some(notice)) => {
                bail!(notice)
            }
            _ => {}
        }
        rx.changed().await?;
    }
}
