use std::collections::HashSet;
use std::fs;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use directories::BaseDirs;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bookshelf_resolver::config::{ConfigLoader, PipelineConfig};
use bookshelf_resolver::domain::{CoverQuery, Isbn};
use bookshelf_resolver::error::ResolveError;
use bookshelf_resolver::output::{JsonOutput, OrphanResult};
use bookshelf_resolver::pipeline::{HttpPipeline, MetadataResolution};

#[derive(Parser)]
#[command(name = "shelf-resolve")]
#[command(about = "Resolve book metadata and covers from Google Books and Open Library")]
#[command(version)]
struct Cli {
    /// JSON pipeline config; flags below override it.
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    upload_root: Option<Utf8PathBuf>,

    #[arg(long, global = true)]
    relative_prefix: Option<String>,

    #[arg(long, global = true, env = "GOOGLE_BOOKS_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Look up metadata by ISBN and fetch its cover")]
    Metadata(MetadataArgs),
    #[command(about = "Find and store the best available cover")]
    Cover(CoverArgs),
    #[command(about = "List ranked cover candidates without downloading")]
    Candidates(CoverArgs),
    #[command(about = "Search books by free text")]
    Search(SearchArgs),
    #[command(about = "Normalize and store a local image file")]
    Upload(UploadArgs),
    #[command(about = "List (and optionally delete) stored images nothing references")]
    Orphans(OrphanArgs),
}

#[derive(Args)]
struct MetadataArgs {
    isbn: String,

    /// Skip the eager cover download.
    #[arg(long)]
    no_cover: bool,
}

#[derive(Args)]
struct CoverArgs {
    #[arg(long)]
    isbn: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    author: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    query: String,

    #[arg(long, default_value_t = 6)]
    limit: usize,
}

#[derive(Args)]
struct UploadArgs {
    path: Utf8PathBuf,
}

#[derive(Args)]
struct OrphanArgs {
    /// File with one referenced relative path per line.
    #[arg(long)]
    referenced: Option<Utf8PathBuf>,

    #[arg(long)]
    delete: bool,
}

enum Outcome {
    Found,
    NotFound,
}

fn main() -> ExitCode {
    match run() {
        Ok(Outcome::Found) => ExitCode::SUCCESS,
        Ok(Outcome::NotFound) => ExitCode::from(2),
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<ResolveError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &ResolveError) -> u8 {
    match error {
        ResolveError::UploadRoot { .. } | ResolveError::HttpClient(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<Outcome> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let pipeline = HttpPipeline::from_config(&config)?;

    match cli.command {
        Command::Metadata(args) => {
            let resolution = if args.no_cover {
                pipeline
                    .lookup_metadata(&args.isbn)?
                    .map(|metadata| MetadataResolution {
                        metadata,
                        cover: None,
                        cover_error: None,
                    })
            } else {
                pipeline.resolve_metadata(&args.isbn)?
            };
            let outcome = found(resolution.is_some());
            JsonOutput::print_metadata(resolution).into_diagnostic()?;
            Ok(outcome)
        }
        Command::Cover(args) => {
            let cover = pipeline.resolve_cover(
                args.isbn.as_deref(),
                args.title.as_deref(),
                args.author.as_deref(),
            )?;
            let outcome = found(cover.is_some());
            JsonOutput::print_cover(cover).into_diagnostic()?;
            Ok(outcome)
        }
        Command::Candidates(args) => {
            let isbn = args
                .isbn
                .as_deref()
                .map(str::parse::<Isbn>)
                .transpose()?;
            let query = CoverQuery::new(isbn, args.title.as_deref(), args.author.as_deref());
            let candidates = pipeline.collect_candidates(&query);
            JsonOutput::print_candidates(&candidates).into_diagnostic()?;
            Ok(found(!candidates.is_empty()))
        }
        Command::Search(args) => {
            let hits = pipeline.search(&args.query, args.limit);
            JsonOutput::print_search(&hits).into_diagnostic()?;
            Ok(found(!hits.is_empty()))
        }
        Command::Upload(args) => {
            let raw = fs::read(args.path.as_std_path()).into_diagnostic()?;
            let stored = pipeline.store_upload(&raw)?;
            JsonOutput::print_cover(Some(stored)).into_diagnostic()?;
            Ok(Outcome::Found)
        }
        Command::Orphans(args) => {
            let referenced = match &args.referenced {
                Some(path) => fs::read_to_string(path.as_std_path())
                    .into_diagnostic()?
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
                None => HashSet::new(),
            };
            let store = pipeline.store();
            let orphans = store.find_orphans(&referenced)?;
            let deleted = if args.delete {
                store.remove_orphans(&orphans)
            } else {
                0
            };
            let total_bytes = orphans.iter().map(|orphan| orphan.size).sum();
            JsonOutput::print_orphans(&OrphanResult {
                orphans,
                total_bytes,
                deleted,
            })
            .into_diagnostic()?;
            Ok(Outcome::Found)
        }
    }
}

fn found(found: bool) -> Outcome {
    if found { Outcome::Found } else { Outcome::NotFound }
}

fn load_config(cli: &Cli) -> miette::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::resolve(path)?,
        None => PipelineConfig::new(default_upload_root()?),
    };
    if let Some(root) = &cli.upload_root {
        config.upload_root = root.clone();
    }
    if let Some(prefix) = &cli.relative_prefix {
        config.relative_prefix = prefix.clone();
    }
    if let Some(key) = &cli.google_api_key {
        config.google_api_key = Some(key.clone());
    }
    Ok(ConfigLoader::resolve_config(config)?)
}

fn default_upload_root() -> miette::Result<Utf8PathBuf> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.data_dir().join("bookshelf-resolver").join("uploads"))
                .ok()
        })
        .ok_or_else(|| miette::Report::msg("unable to resolve a default upload root"))
}
