#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod input;
mod report;
mod telemetry;

use std::process;

use anyhow::Context;
use imgup_core::{CwebpTranscoder, SourceReference, TranscodeService, UploadPipeline};
use imgup_reqwest::ReqwestClient;

use crate::config::{AppConfig, Cli};

// Tracing target constants
pub const TRACING_TARGET_CLI: &str = "imgup_cli::main";
pub const TRACING_TARGET_CONFIG: &str = "imgup_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    tracing::debug!(
        target: TRACING_TARGET_CLI,
        error = ?error,
        "application terminated with error"
    );
    eprintln!("Error: {error:#}");

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing()?;
    cli.log();

    let program_dir = config::program_dir();
    let config_path = cli.config_path(&program_dir);
    let app = AppConfig::load(&config_path, &cli.provider)
        .context("failed to load configuration")?;

    let raw = input::resolve_input(cli.input.as_deref()).await?;
    let reference = SourceReference::parse(&raw, &program_dir)?;

    let pipeline = create_pipeline(&cli, &app)?;
    let receipt = pipeline
        .run(&reference, &app.settings())
        .await
        .with_context(|| format!("failed to upload {reference}"))?;

    tracing::info!(
        target: TRACING_TARGET_CLI,
        key = %receipt.key,
        host = %receipt.host,
        attempt = %receipt.attempt,
        hash = ?receipt.remote_hash(),
        fsize = ?receipt.remote_size(),
        "Upload finished"
    );

    println!("{}", report::render_receipt(&receipt));
    Ok(())
}

/// Wires the HTTP client and, when enabled, the WebP encoder into a pipeline.
fn create_pipeline(cli: &Cli, app: &AppConfig) -> anyhow::Result<UploadPipeline> {
    let client = ReqwestClient::new(cli.http.clone(), cli.provider.clone())
        .context("failed to create HTTP client")?;

    let transcoder = app
        .enable_webp
        .then(|| TranscodeService::new(CwebpTranscoder::new(&cli.cwebp)));

    Ok(UploadPipeline::new(
        client.clone().into_fetch_service(),
        client.into_upload_service(),
        transcoder,
    ))
}
