use clap::Parser;
use corpus_ingest::config::AppConfig;
use corpus_ingest::embedding::{EmbeddingModel, TextEmbedder};
use corpus_ingest::error::{CorpusError, Result};
use corpus_ingest::ingest::{CorpusIngestor, CorpusScanner};
use corpus_ingest::store::DocumentStore;
use corpus_ingest::validate::validate_collection;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Vectorize a text corpus into a replicated MongoDB collection.
#[derive(Parser, Debug)]
#[command(name = "corpus-ingest", version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Corpus directory, overriding the configured one.
    #[arg(long)]
    corpus_dir: Option<PathBuf>,

    /// MongoDB connection string, overriding the configured one.
    #[arg(long)]
    mongo_uri: Option<String>,

    /// Skip the post-run collection audit.
    #[arg(long)]
    skip_validation: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("failed to load configuration: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.corpus_dir {
        config.corpus.dir = dir;
    }
    if let Some(uri) = cli.mongo_uri {
        config.mongo.uri = uri;
    }

    let _log_guard = init_tracing(&config.log_file);

    match run(config, cli.skip_validation).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "ingestion run failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig, skip_validation: bool) -> Result<()> {
    if !config.corpus.dir.is_dir() {
        return Err(CorpusError::MissingDirectory(config.corpus.dir.clone()).into());
    }

    tracing::info!(cache_dir = %config.embedding.cache_dir.display(), "loading embedding model");
    let model = Arc::new(EmbeddingModel::load(
        &config.embedding.cache_dir,
        config.embedding.dimension,
    )?);
    tracing::info!(dimension = model.dimension(), "embedding model ready");

    let store = DocumentStore::connect(&config.mongo).await?;

    let scanner = CorpusScanner::new(config.corpus.dir.clone(), config.corpus.extension.clone());
    let ingestor = CorpusIngestor::new(scanner, model.clone() as Arc<dyn TextEmbedder>);

    let stats = ingestor.run(&store).await?;

    let collection_total = match store.count().await {
        Ok(total) => Some(total),
        Err(error) => {
            tracing::warn!(%error, "final count query failed");
            None
        }
    };

    let summary = stats.finish(collection_total);
    tracing::info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        failed = summary.failed,
        elapsed_secs = summary.elapsed.as_secs_f64(),
        "ingestion complete"
    );
    println!("{summary}");

    if !skip_validation {
        match validate_collection(&store, model.dimension()).await {
            Ok(report) => println!("{report}"),
            Err(error) => tracing::warn!(%error, "post-run validation failed"),
        }
    }

    if let Err(error) = store.create_indexes().await {
        tracing::warn!(%error, "index creation failed");
    }

    Ok(())
}

/// Log to stdout and to the configured file. The returned guard flushes the
/// file writer on drop and must stay alive for the whole run.
fn init_tracing(log_file: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let directory = log_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .unwrap_or_else(|| OsStr::new("corpus-ingest.log"));

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    guard
}
