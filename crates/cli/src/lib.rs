//! `fvi` command-line front end.
//!
//! Stdout carries command output (pretty JSON with `--json`); logs go to
//! stderr.

pub mod app;
pub mod config;
pub mod corpus;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use fvi_protocol::{ContextRequest, ContextResponse, ErrorEnvelope, ScoreRequest, ScoreResponse};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::FviConfig;

#[derive(Parser)]
#[command(name = "fvi")]
#[command(about = "Future Viability Index scoring and knowledge retrieval", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./fvi.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Output JSON format
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the score sources and report validation issues and coverage
    Check,

    /// Composite score of one entity under one persona
    Score(ScoreArgs),

    /// Composite of one entity under every persona
    Compare {
        /// Entity name, alias or ISO-3 code
        entity: String,
    },

    /// Rank every scored entity for a persona
    Rank(RankArgs),

    /// Chunk and embed the knowledge corpus, add assessments, and save the index
    #[command(name = "build-index")]
    BuildIndex,

    /// Show statistics of the saved index
    Stats,

    /// Retrieve the fused context bundle for a question
    Context(QueryArgs),

    /// Answer a question from fused context
    Ask(QueryArgs),
}

#[derive(Args)]
struct ScoreArgs {
    /// Entity name, alias or ISO-3 code
    entity: String,

    #[arg(long, short = 'p', default_value = "analyst")]
    persona: String,
}

#[derive(Args)]
struct RankArgs {
    #[arg(long, short = 'p', default_value = "analyst")]
    persona: String,

    /// Show only the first N entities
    #[arg(long, short = 'n')]
    limit: Option<usize>,
}

#[derive(Args)]
struct QueryArgs {
    query: String,

    /// Persona (detected from the query when omitted)
    #[arg(long, short = 'p')]
    persona: Option<String>,

    /// Entity filter (detected from the query when omitted)
    #[arg(long, short = 'e')]
    entity: Option<String>,

    /// Deadline for retrieval in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl QueryArgs {
    fn request(&self) -> ContextRequest {
        ContextRequest {
            query: self.query.clone(),
            persona_id: self.persona.clone(),
            entity_id: self.entity.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = FviConfig::load(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Check => run_check(&config, json),
        Commands::Score(args) => run_score(&config, args, json).await,
        Commands::Compare { entity } => run_compare(&config, &entity, json).await,
        Commands::Rank(args) => run_rank(&config, args, json).await,
        Commands::BuildIndex => run_build_index(&config, json).await,
        Commands::Stats => run_stats(&config, json).await,
        Commands::Context(args) => run_context(&config, args, json).await,
        Commands::Ask(args) => run_ask(&config, args, json).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a routed failure and exit non-zero.
fn fail(envelope: &ErrorEnvelope, json: bool) -> Result<()> {
    if json {
        print_json(envelope)?;
    } else {
        eprintln!("Error: {}", envelope.message);
        if let Some(hint) = &envelope.hint {
            eprintln!("Hint: {hint}");
        }
    }
    std::process::exit(1);
}

fn run_check(config: &FviConfig, json: bool) -> Result<()> {
    let (_, report) = app::load_scores(config)?;
    if json {
        return print_json(&report);
    }
    println!("{}", report.summary());
    for (dimension, entities) in &report.coverage {
        println!("  {dimension}: {entities}/{} entities", report.entities);
    }
    for issue in &report.issues {
        println!("  skipped: {issue}");
    }
    Ok(())
}

async fn run_score(config: &FviConfig, args: ScoreArgs, json: bool) -> Result<()> {
    let router = score_router(config).await?;
    let request = ScoreRequest {
        entity_id: args.entity,
        persona_id: args.persona,
    };
    match router.handle_score(&request) {
        Ok(response) if json => print_json(&response),
        Ok(response) => {
            print_score(&response);
            Ok(())
        }
        Err(envelope) => fail(&envelope, json),
    }
}

async fn run_compare(config: &FviConfig, entity: &str, json: bool) -> Result<()> {
    let router = score_router(config).await?;
    match router.compare_personas(entity) {
        Ok(rows) if json => print_json(&rows),
        Ok(rows) => {
            if let Some(first) = rows.first() {
                println!("{}", first.entity_id);
            }
            for row in &rows {
                println!("  {:<13} {:>6.2}  {}", row.persona_id, row.composite, row.recommendation);
            }
            Ok(())
        }
        Err(envelope) => fail(&envelope, json),
    }
}

async fn run_rank(config: &FviConfig, args: RankArgs, json: bool) -> Result<()> {
    let router = score_router(config).await?;
    match router.rank(&args.persona, args.limit) {
        Ok(ranked) if json => print_json(&ranked),
        Ok(ranked) => {
            for row in ranked {
                println!("{:>3}. {:<24} {:>6.2}", row.rank, row.entity_id.as_str(), row.composite);
            }
            Ok(())
        }
        Err(envelope) => fail(&envelope, json),
    }
}

async fn run_build_index(config: &FviConfig, json: bool) -> Result<()> {
    let (aggregator, _) = app::load_scores(config)?;
    let stats = app::build_index(config, &aggregator).await?;
    if json {
        return print_json(&stats);
    }
    eprintln!(
        "Indexed {} chunks ({} knowledge, {} assessment) into {}",
        stats.total_chunks,
        stats.knowledge_chunks,
        stats.assessment_chunks,
        config.paths.index.display()
    );
    Ok(())
}

async fn run_stats(config: &FviConfig, json: bool) -> Result<()> {
    let stats = app::open_index(config).await?.stats();
    if json {
        return print_json(&stats);
    }
    println!("{stats}");
    Ok(())
}

async fn run_context(config: &FviConfig, args: QueryArgs, json: bool) -> Result<()> {
    let router = app::open_router(config).await?;
    match router.handle_context(&args.request()).await {
        Ok(response) if json => print_json(&response),
        Ok(response) => {
            print_context(&response);
            Ok(())
        }
        Err(envelope) => fail(&envelope, json),
    }
}

async fn run_ask(config: &FviConfig, args: QueryArgs, json: bool) -> Result<()> {
    let router = app::open_router(config).await?;
    match router.answer(&args.request()).await {
        Ok(response) if json => print_json(&response),
        Ok(response) => {
            println!("{}", response.answer);
            if !response.context.data_sources.is_empty() {
                println!("\nSources: {}", response.context.data_sources.join(", "));
            }
            Ok(())
        }
        Err(envelope) => fail(&envelope, json),
    }
}

/// Score commands need no knowledge index, and no embedding model either.
async fn score_router(config: &FviConfig) -> Result<fvi_router::QueryRouter> {
    let (aggregator, _) = app::load_scores(config)?;
    let embedder = std::sync::Arc::new(fvi_vector_store::HashingEmbedder::new(config.embedding.dimension));
    let index = fvi_vector_store::KnowledgeIndex::new(embedder, config.chunking.clone())?;
    let engine = fvi_fusion::ContextFusionEngine::new(
        std::sync::Arc::new(index),
        aggregator,
        config.retrieval.fusion.clone(),
    )?;
    Ok(fvi_router::QueryRouter::new(std::sync::Arc::new(engine))?)
}

fn print_score(response: &ScoreResponse) {
    println!(
        "{} ({}): {:.2}  recommendation {}  viability {}",
        response.entity_id,
        response.persona_id,
        response.composite,
        response.recommendation,
        response.viability
    );
    for (dimension, c) in &response.contributions {
        println!(
            "  {:<19} raw {:>6.2}  weight {:>5.1}%  share {:>5.1}%{}",
            dimension,
            c.raw_score,
            c.weight * 100.0,
            c.contribution_pct,
            if c.imputed { "  (imputed)" } else { "" }
        );
    }
}

fn print_context(response: &ContextResponse) {
    let entity = response.entity_id.as_deref().unwrap_or("-");
    println!(
        "persona {}  entity {}  {} passages  {}/{} chars{}",
        response.persona_id,
        entity,
        response.passages.len(),
        response.used_chars,
        response.max_chars,
        if response.truncated { "  (truncated)" } else { "" }
    );
    if let Some(score) = &response.score {
        println!("score {:.2}  {}  viability {}", score.composite, score.recommendation, score.viability);
    }
    for (i, passage) in response.passages.iter().enumerate() {
        println!(
            "\n{}. {} [{}] (relevance {:.3})",
            i + 1,
            passage.chunk_id,
            passage.category,
            passage.relevance
        );
        println!("{}", passage.text);
    }
}
