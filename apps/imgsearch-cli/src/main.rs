use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use imgsearch_core::config::Config;
use imgsearch_core::{ColorBucket, FilterCriteria, Objective, Orientation, ScoringWeights, SearchMode};
use imgsearch_cli::{parse, seed};
use imgsearch_embed::get_default_embedder;
use imgsearch_rank::cosine_similarity;
use imgsearch_search::bootstrap::open_lance;
use imgsearch_search::{RawQueryInput, RankedSearchResponse};
use imgsearch_vector::{index_build, select_profile, table, LanceCandidateWriter, LanceVectorIndex};

#[derive(Parser, Debug)]
#[command(name = "imgsearch")]
#[command(about = "Multi-modal image search over a local LanceDB store")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Print machine-readable JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank stored images against a text and/or image query
    Search(SearchArgs),

    /// Choose an index profile for the corpus and build it
    Provision(ProvisionArgs),

    /// Load candidates from a JSON or JSON-lines file
    Seed(SeedArgs),

    /// Show vector counts per namespace
    Stats,

    /// Cosine similarity of two comma-separated vectors
    Similarity {
        #[arg(allow_hyphen_values = true)]
        a: String,
        #[arg(allow_hyphen_values = true)]
        b: String,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Query text
    text: Option<String>,

    /// Query image: a file path or an http(s) URL
    #[arg(long)]
    image: Option<String>,

    /// text, image or hybrid; inferred from the inputs when omitted
    #[arg(long)]
    mode: Option<SearchMode>,

    /// Text share of the hybrid query vector; the image gets the rest
    #[arg(long)]
    text_weight: Option<f32>,

    /// Fusion weights as IMAGE,TEXT,METADATA
    #[arg(long)]
    weights: Option<String>,

    /// Soft colour preference
    #[arg(long)]
    prefer_color: Option<ColorBucket>,

    /// Keep only this colour bucket
    #[arg(long)]
    color: Option<ColorBucket>,

    #[arg(long)]
    orientation: Option<Orientation>,

    #[arg(long)]
    min_score: Option<f32>,

    #[arg(long, value_parser = parse::day)]
    from: Option<NaiveDate>,

    #[arg(long, value_parser = parse::day)]
    to: Option<NaiveDate>,

    #[arg(long, short = 'k')]
    top_k: Option<usize>,

    /// Candidates fetched from the index before filtering
    #[arg(long)]
    candidates: Option<usize>,

    #[arg(long)]
    namespace: Option<String>,
}

#[derive(Args, Debug)]
struct ProvisionArgs {
    /// Defaults to index.expected_corpus_size, or the current row count with --measure
    #[arg(long)]
    corpus_size: Option<usize>,

    /// accuracy, speed or memory; defaults to index.objective
    #[arg(long)]
    objective: Option<Objective>,

    #[arg(long)]
    namespace: Option<String>,

    /// Size the profile from the rows already stored
    #[arg(long)]
    measure: bool,

    /// Print the chosen profile without building anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct SeedArgs {
    file: PathBuf,

    #[arg(long)]
    namespace: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let base = std::env::current_dir()?;
    match cli.command {
        Command::Search(args) => run_search(&config, &base, args, cli.json).await,
        Command::Provision(args) => run_provision(&config, &base, args, cli.json).await,
        Command::Seed(args) => run_seed(&config, &base, args).await,
        Command::Stats => {
            let index = config.index()?;
            let store = LanceVectorIndex::open(&index.db_path(&base), index.dimension).await?;
            let stats = store.describe_stats().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("📊 dimension={} total_vectors={}", stats.dimension, stats.total_vectors);
                for (ns, n) in &stats.namespaces { println!("  {ns}: {n}"); }
            }
            Ok(())
        }
        Command::Similarity { a, b } => {
            let (a, b) = (parse::vector(&a).map_err(anyhow::Error::msg)?, parse::vector(&b).map_err(anyhow::Error::msg)?);
            let score = cosine_similarity(&a, &b)?;
            if cli.json { println!("{}", serde_json::json!({ "similarity": score })); } else { println!("{score:.6}"); }
            Ok(())
        }
    }
}

async fn run_search(config: &Config, base: &std::path::Path, args: SearchArgs, json: bool) -> Result<()> {
    let weights = args.weights.as_deref().map(parse::vector).transpose().map_err(anyhow::Error::msg)?;
    let weights = match weights.as_deref() {
        None => None,
        Some([image, text, metadata]) => Some(ScoringWeights::new(*image, *text, *metadata)?),
        Some(other) => bail!("--weights takes IMAGE,TEXT,METADATA, got {} values", other.len()),
    };
    let query_image = args.image.as_deref().map(parse::image_input).transpose()?;
    let input = RawQueryInput {
        query_text: args.text,
        query_image,
        mode: args.mode,
        hybrid_text_weight: args.text_weight,
        weights,
        filters: FilterCriteria {
            min_score: args.min_score,
            color: args.color,
            orientation: args.orientation,
            date_from: args.from,
            date_to: args.to,
        },
        target_color: args.prefer_color,
        top_k: args.top_k,
    };

    let search = open_lance(config, base).await?;
    let mut options = search.options_for(&input)?;
    if let Some(ns) = args.namespace { options = options.with_namespace(ns); }
    if let Some(n) = args.candidates { options = options.with_candidates(n); }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() { on_interrupt.cancel(); }
    });

    let response = search.search(input, &options, &cancel).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &RankedSearchResponse) {
    let q = &response.effective_query;
    println!("🔍 mode={} namespace={} retrieved={} returned={}", q.mode, q.namespace, q.candidates_retrieved, response.count);
    println!(
        "   weights: image={:.3} text={:.3} metadata={:.3}",
        q.weights.image_weight(),
        q.weights.text_weight(),
        q.weights.metadata_weight()
    );
    for (i, r) in response.results.iter().enumerate() {
        let s = &r.component_scores;
        println!(
            "\n  {}. score={:.4}  id={}  (image={:.3} text={:.3} metadata={:.3})",
            i + 1,
            r.final_score,
            r.candidate_id,
            s.image,
            s.text,
            s.metadata
        );
        if let Some(desc) = r.metadata.get("description").and_then(|v| v.as_str()) {
            println!("     📝 {desc}");
        }
    }
    if !response.skipped.is_empty() {
        println!("\n⚠️  skipped {} unscorable candidates", response.skipped.len());
    }
}

async fn run_provision(config: &Config, base: &std::path::Path, args: ProvisionArgs, json: bool) -> Result<()> {
    let settings = config.index()?;
    let namespace = args.namespace.unwrap_or(config.search()?.namespace);
    table::validate_namespace(&namespace)?;
    let conn = table::open_db(&settings.db_path(base).to_string_lossy()).await?;
    let corpus_size = match (args.corpus_size, args.measure) {
        (Some(n), _) => n,
        (None, true) => index_build::count_vectors(&conn, &namespace).await?,
        (None, false) => settings.expected_corpus_size,
    };
    let objective = args.objective.unwrap_or(settings.objective);
    let profile = select_profile(corpus_size, objective, settings.dimension);
    info!(corpus_size, ?objective, family = %profile.family, "selected index profile");
    if json { println!("{}", serde_json::to_string_pretty(&profile)?); } else { println!("🧭 {}", profile.index_name()); }
    if args.dry_run { return Ok(()); }

    if !table::table_exists(&conn, &namespace).await? {
        bail!("namespace '{namespace}' has no data yet; run `imgsearch seed` first");
    }
    let name = index_build::build_index(&conn, &namespace, &profile).await?;
    if !index_build::validate_index(&conn, &namespace, 10, 5).await? {
        bail!("index {name} failed validation; active index left unchanged");
    }
    index_build::flip_active_index(&conn, &namespace, &name).await?;
    index_build::record_profile(&conn, &namespace, &profile).await?;
    println!("✅ active index for '{namespace}' is now {name}");
    Ok(())
}

async fn run_seed(config: &Config, base: &std::path::Path, args: SeedArgs) -> Result<()> {
    let index = config.index()?;
    let embedding = config.embedding()?;
    let dim = embedding.dim_for(&index)?;
    let namespace = args.namespace.unwrap_or(config.search()?.namespace);

    let records = seed::load_records(&args.file)?;
    println!("Seeding {} records from {} into '{}'", records.len(), args.file.display(), namespace);
    let embedder = get_default_embedder(&embedding, dim)?;
    let candidates = seed::to_candidates(records, embedder.as_ref()).await?;
    let writer = LanceCandidateWriter::new(&index.db_path(base), &namespace, dim).await?.with_progress(true);
    let written = writer.upsert(&candidates).await?;
    println!("✅ Seed complete ({written} candidates)");
    Ok(())
}
