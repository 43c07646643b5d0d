use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use guidebook::client::{BACKEND_FAILURE, DEFAULT_BACKEND_URL};
use guidebook::{render_answer, telemetry, AskClient};
use tracing::debug;

const EMPTY_QUESTION: &str = "Please enter a question before submitting.";

#[derive(Parser, Debug)]
#[command(
    name = "guidebook-ask",
    about = "Ask the guidebook API questions from the terminal"
)]
struct AskCli {
    /// Ask a single question and exit instead of prompting
    #[arg(long, short)]
    query: Option<String>,

    /// URL of the /ask endpoint
    #[arg(long, env = "GUIDEBOOK_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Directory relative image paths are resolved against
    #[arg(long, default_value = ".")]
    image_root: PathBuf,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    telemetry::init();
    let cli = AskCli::parse();
    let client = AskClient::new(cli.backend_url.clone()).context("failed to build HTTP client")?;

    if let Some(query) = cli.query.as_deref() {
        submit(&client, query, &cli);
        return Ok(());
    }

    println!("Ask a question about the application (Ctrl-D to quit).");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush stdout")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read question")?;
        submit(&client, &line, &cli);
    }
    Ok(())
}

fn submit(client: &AskClient, query: &str, cli: &AskCli) {
    if query.trim().is_empty() {
        println!("{EMPTY_QUESTION}");
        return;
    }
    match client.ask(query) {
        Ok(answer) => println!("{}", render_answer(&answer, &cli.image_root)),
        Err(err) => {
            debug!(error = %err, url = %cli.backend_url, "ask failed");
            println!("{BACKEND_FAILURE}");
        }
    }
}
