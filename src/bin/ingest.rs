use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use guidebook::config::{OpenAiArgs, PineconeArgs};
use guidebook::extractor::DEFAULT_IMAGE_DIR;
use guidebook::{telemetry, IngestPipeline};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "guidebook-ingest",
    about = "Extract a PDF guide and index its pages in Pinecone"
)]
struct IngestCli {
    /// PDF document to ingest
    pdf: PathBuf,

    /// Directory extracted images are written to
    #[arg(long, env = "GUIDEBOOK_IMAGE_DIR", default_value = DEFAULT_IMAGE_DIR)]
    image_dir: PathBuf,

    #[command(flatten)]
    openai: OpenAiArgs,

    #[command(flatten)]
    pinecone: PineconeArgs,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    telemetry::init();
    let cli = IngestCli::parse();

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
    let pipeline = IngestPipeline::new(embedder, index, &cli.image_dir);

    info!(pdf = %cli.pdf.display(), image_dir = %cli.image_dir.display(), "ingesting");
    let report = pipeline
        .ingest_path(&cli.pdf)
        .with_context(|| format!("failed to ingest {}", cli.pdf.display()))?;

    println!(
        "indexed {} pages, wrote {} images to {}",
        report.pages_indexed,
        report.images_written,
        cli.image_dir.display()
    );
    if !report.skipped_images.is_empty() {
        println!("skipped {} images:", report.skipped_images.len());
        for skipped in &report.skipped_images {
            println!(
                "  page {} image {}: {}",
                skipped.page_number, skipped.image_index, skipped.reason
            );
        }
    }
    Ok(())
}
