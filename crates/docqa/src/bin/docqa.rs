//! Interactive document Q&A
//!
//! Run with: cargo run -p docqa -- report.pdf notes.md

use std::path::PathBuf;

use clap::Parser;
use console::style;
use docqa::{
    catalog,
    providers::{create_embedder, create_llm, LlmProvider},
    ConversationOrchestrator, IngestProgress, RagConfig, UploadedFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "docqa", version, about = "Ask questions about local documents with a local Ollama model")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ollama model used for answers (overrides the configuration)
    #[arg(short, long)]
    model: Option<String>,

    /// Files to ingest before the prompt opens
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RagConfig::load(path)?,
        None => {
            let mut config = RagConfig::default();
            config.apply_env();
            config
        }
    };
    if let Some(model) = args.model {
        config.llm.model = model;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embeddings: {:?} / {}", config.embeddings.backend, config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!("  - Chunk size: {} (overlap {})", config.chunking.chunk_size, config.chunking.chunk_overlap);
    tracing::info!("  - Index: {}", config.index.directory.display());

    let llm = create_llm(&config)?;
    if !llm.health_check().await.unwrap_or(false) {
        tracing::warn!("Ollama not available at {}", config.llm.base_url);
        tracing::warn!("Please start Ollama:");
        tracing::warn!("  1. Start: ollama serve");
        tracing::warn!("  2. Pull models: ollama pull {} && ollama pull {}", config.embeddings.model, config.llm.model);
    }

    let embedder = create_embedder(&config).await?;
    let mut session = ConversationOrchestrator::new(config, embedder, llm.clone())?;

    println!(
        "{} {}",
        style("docqa").bold().cyan(),
        style("local document Q&A, type /help for commands").dim()
    );

    if !args.files.is_empty() {
        ingest(&mut session, &args.files).await;
    } else if session.state() == docqa::SessionState::Ready {
        println!(
            "Loaded saved index with {} chunk(s) from {} file(s)",
            session.index().len(),
            session.processed_files().len()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(&session);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/status" => print_status(&session),
            "/models" => print_models(llm.as_ref(), session.engine().model()).await,
            "/model" => switch_model(&mut session, rest.trim()),
            "/reset" => {
                session.reset();
                println!("{}", style("Session cleared. Upload documents with /ingest.").yellow());
            }
            "/ingest" => {
                let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
                if paths.is_empty() {
                    println!("usage: /ingest <file>...");
                } else {
                    ingest(&mut session, &paths).await;
                }
            }
            _ if command.starts_with('/') => println!("Unknown command {}, try /help", command),
            _ => answer(&mut session, line).await,
        }
    }

    Ok(())
}

fn print_prompt(session: &ConversationOrchestrator) {
    use std::io::Write;
    print!("{} ", style(format!("[{}]>", session.engine().model())).green());
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("  <question>        ask about the ingested documents");
    println!("  /ingest <file>... upload and index files (replaces the current index)");
    println!("  /model <id>       switch the answering model");
    println!("  /models           list known models");
    println!("  /status           show session status");
    println!("  /reset            clear chat, index and uploaded files");
    println!("  /quit             exit");
}

fn read_uploads(paths: &[PathBuf]) -> Vec<UploadedFile> {
    paths
        .iter()
        .filter_map(|path| match UploadedFile::from_path(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("{} {}: {}", style("skipped").red(), path.display(), e);
                None
            }
        })
        .collect()
}

async fn ingest(session: &mut ConversationOrchestrator, paths: &[PathBuf]) {
    let uploads = read_uploads(paths);
    let pb = ProgressBar::new(uploads.len() as u64);
    if let Ok(bar_style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(bar_style.progress_chars("=> "));
    }

    let result = session
        .ingest_with_progress(uploads, |event| match event {
            IngestProgress::FileDone { name, index, .. } => {
                pb.set_position(index as u64);
                pb.set_message(name);
            }
            IngestProgress::Indexing { chunks } => pb.set_message(format!("embedding {} chunk(s)", chunks)),
            IngestProgress::Complete { chunks } => pb.finish_with_message(format!("{} chunk(s) indexed", chunks)),
        })
        .await;

    match result {
        Ok(report) => {
            for file in &report.files {
                let marker = if file.status.is_extracted() {
                    style("ok").green()
                } else {
                    style("placeholder").yellow()
                };
                println!("  {} {} ({} chunk(s))", marker, file.name, file.chunks);
            }
            println!(
                "{} {} file(s), {} chunk(s) in {:.1}s",
                style("Ready:").bold().green(),
                report.files.len(),
                report.total_chunks,
                report.elapsed_ms as f64 / 1000.0
            );
        }
        Err(e) => {
            pb.abandon();
            eprintln!("{} {}", style("Ingestion failed:").bold().red(), e);
        }
    }
}

async fn answer(session: &mut ConversationOrchestrator, question: &str) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let result = session.ask(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);
            if !response.source_documents.is_empty() {
                println!("{}", style("Sources:").bold());
                for (i, source) in response.source_documents.iter().enumerate() {
                    let page = source.page.map(|p| format!(", page {}", p)).unwrap_or_default();
                    let preview: String = source.content.chars().take(100).collect();
                    println!("  [{}] {}{}: {}", i + 1, style(&source.source_name).cyan(), page, style(preview.replace('\n', " ")).dim());
                }
            }
            println!("{}", style(format!("{} in {:.1}s", response.model, response.elapsed_ms as f64 / 1000.0)).dim());
        }
        Err(e) => eprintln!("{} {}", style("Error:").bold().red(), e),
    }
}

fn switch_model(session: &mut ConversationOrchestrator, model: &str) {
    if model.is_empty() {
        println!("usage: /model <id>   (see /models)");
        return;
    }
    match session.switch_model(model) {
        Ok(()) => println!("Switched to {} ({})", style(model).bold(), catalog::describe(model)),
        Err(e) => eprintln!("{} {}", style("Error:").bold().red(), e),
    }
}

fn print_status(session: &ConversationOrchestrator) {
    let status = session.status();
    println!("  state:    {}", status.state);
    println!("  model:    {} ({})", status.model, catalog::describe(&status.model));
    println!("  chunks:   {}", status.chunk_count);
    println!("  messages: {}", status.message_count);
    println!("  index:    {}", session.config().index.directory.display());
    if status.processed_files.is_empty() {
        println!("  files:    none");
    } else {
        println!("  files:    {}", status.processed_files.join(", "));
    }
}

async fn print_models(llm: &dyn LlmProvider, current: &str) {
    let installed = llm.list_models().await.unwrap_or_default();
    for family in catalog::MODEL_FAMILIES {
        println!("{} {}", style(family.label).bold(), style(family.description).dim());
        for model in family.models {
            let marker = if *model == current {
                "*"
            } else if installed.iter().any(|m| m.as_str() == *model) {
                "+"
            } else {
                " "
            };
            println!("  {} {}", marker, model);
        }
    }
    println!("{}", style("* active   + installed locally").dim());
}
