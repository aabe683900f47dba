//! Interactive terminal session: collect up to four URLs, index them, then
//! answer questions about their content until a blank line ends the session.

use std::io::{self, Write};
use std::process;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

use askpages::ingestion::{IngestStage, Progress, ingest_urls};
use askpages::{AppConfig, AppContext, AskError};

const MAX_URLS: usize = 4;

struct StdoutProgress;

impl Progress for StdoutProgress {
    fn stage(&self, stage: IngestStage) {
        println!("{stage}");
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<(), AskError> {
    let config = AppConfig::from_env()?;
    let ctx = AppContext::initialize(config).await?;

    println!("askpages — answer questions from a handful of web pages");
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let urls = prompt_urls(&mut input).await?;
    if urls.is_empty() {
        println!("You must provide at least one valid URL.");
    } else {
        let report = ingest_urls(&ctx, &urls, &StdoutProgress).await?;
        println!(
            "Indexed {} chunks from {} page(s).",
            report.chunks, report.pages
        );
    }

    let engine = ctx.engine();
    loop {
        prompt("\nQuestion (blank line to exit): ")?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        match engine.answer(question).await {
            Ok(answer) => {
                println!("\nAnswer:\n{}", answer.text);
                if !answer.sources.is_empty() {
                    println!("\nSources:");
                    for source in &answer.sources {
                        println!("  {source}");
                    }
                }
            }
            // Recoverable: the user can still process URLs in a fresh run.
            Err(err @ AskError::NotIngested) => println!("{err}"),
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

/// Reads up to four URLs, one per prompt; a blank line ends entry early.
/// Unparseable entries are reported and skipped.
async fn prompt_urls(input: &mut Lines<BufReader<Stdin>>) -> Result<Vec<Url>, AskError> {
    let mut urls = Vec::new();
    for slot in 1..=MAX_URLS {
        prompt(&format!("URL {slot} (blank to finish): "))?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        let entry = line.trim();
        if entry.is_empty() {
            break;
        }
        match Url::parse(entry) {
            Ok(url) => urls.push(url),
            Err(_) => println!("  skipping invalid URL '{entry}'"),
        }
    }
    Ok(urls)
}

fn prompt(label: &str) -> Result<(), AskError> {
    print!("{label}");
    io::stdout().flush()?;
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("askpages=warn"));
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
