use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use guidebook::config::{LlmArgs, OpenAiArgs, PineconeArgs};
use guidebook::extractor::DEFAULT_IMAGE_DIR;
use guidebook::{router, telemetry, AnswerGenerator, AppState, Retriever, DEFAULT_TOP_K};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "guidebook-api",
    about = "HTTP API answering questions about ingested guides"
)]
struct ApiCli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "GUIDEBOOK_BIND", default_value = "127.0.0.1:5000")]
    bind: String,

    /// Pages retrieved per question.
    #[arg(
        long,
        env = "GUIDEBOOK_TOP_K",
        default_value_t = DEFAULT_TOP_K,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    top_k: usize,

    /// Directory holding extracted images, served under /images.
    #[arg(long, env = "GUIDEBOOK_IMAGE_DIR", default_value = DEFAULT_IMAGE_DIR)]
    image_dir: PathBuf,

    #[command(flatten)]
    openai: OpenAiArgs,

    #[command(flatten)]
    pinecone: PineconeArgs,

    #[command(flatten)]
    llm: LlmArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    telemetry::init();
    let cli = ApiCli::parse();
    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;

    // The hosted API clients are blocking; build them off the runtime threads.
    let state = tokio::task::spawn_blocking(move || build_state(cli))
        .await
        .context("client setup task failed")??;

    info!(%addr, "guidebook-api listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router(state))
        .await
        .context("server shutdown")?;
    Ok(())
}

fn build_state(cli: ApiCli) -> Result<AppState> {
    let embedder = Arc::new(
        cli.openai
            .build_embedder()
            .context("failed to build embedding client")?,
    );
    let index = Arc::new(
        cli.pinecone
            .connect_index(cli.openai.timeout())
            .context("failed to connect to Pinecone")?,
    );
    let provider = cli
        .llm
        .build_provider(&cli.openai)
        .context("failed to build answer provider")?;
    info!(
        embedding_model = %embedder.model(),
        index = %cli.pinecone.pinecone_index_name,
        provider = ?cli.llm.llm_provider,
        top_k = cli.top_k,
        "clients ready"
    );
    Ok(AppState::new(
        Retriever::new(embedder, index),
        AnswerGenerator::new(provider),
        cli.top_k,
        cli.image_dir,
    ))
}
