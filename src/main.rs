use anyhow::Context;
use clap::Parser;
use pdfrag::{api, config, logging, processing::RagService};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "pdfrag",
    about = "Question answering and summarization over uploaded PDFs"
)]
struct Cli {
    /// Port to listen on; overrides `PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Env file to load instead of `.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let config =
        config::load_config(cli.env_file.as_deref()).context("failed to load configuration")?;
    let service = RagService::build(&config)
        .await
        .context("failed to initialize service")?;
    let app = api::create_router(Arc::new(service), &config.allowed_origins);

    let port = cli.port.unwrap_or(config.server_port);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
