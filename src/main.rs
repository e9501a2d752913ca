//! `aerolex-asr`: the session-scoped streaming ASR binary. Loads the
//! session descriptor and pipeline configuration, builds the Session
//! Controller, and runs it until the audio stream closes or the
//! process is asked to shut down.

use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aerolex_asr::cli::Cli;
use aerolex_asr::config::read_app_config;
use aerolex_asr::reference_set::ReferenceSet;
use aerolex_asr::session::{SessionConfig, SessionController};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "session terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let session_config = SessionConfig::load(&cli)?;
    tracing::info!(
        student_id = %session_config.student_id,
        video_id = %session_config.video_id,
        session_id = %session_config.session_id,
        "starting session"
    );

    let app_config = read_app_config(&cli.config_path)?;

    let references = match &cli.references_path {
        Some(path) => Some(ReferenceSet::load(path)?),
        None => None,
    };

    let mut controller = SessionController::new(
        session_config,
        app_config,
        cli.device,
        &cli.vad_model_path,
        &cli.whisper_model_path,
        references,
        cli.submission_endpoint.clone(),
    )?;

    let running = controller.running_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            running.store(false, Ordering::Relaxed);
        }
    });

    controller.run().await?;
    Ok(())
}
