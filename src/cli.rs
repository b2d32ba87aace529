//! Recipe Memory CLI - inspect and feed the recipe memory from a shell
//!
//! Usage:
//!   recipe-memory save "summary" --title T --ingredient egg --cuisine Korean --ready-in 20
//!   recipe-memory similar "query" --limit 3
//!   recipe-memory history            List saved recipes for the user
//!   recipe-memory prefs              Show derived preferences
//!   recipe-memory params             Show personalized search parameters
//!   recipe-memory rebuild            Re-embed the index from history
//!   recipe-memory seed recipes.txt   Save one summary per line

use clap::{Parser, Subcommand};
use colored::*;
use recipe_memory::{
    HashEmbeddingProvider, MemoryConfig, RecipeMemory, SaveOutcome, SummaryMetadata,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "recipe-memory")]
#[command(about = "Recipe memory and preference engine")]
#[command(version)]
struct Cli {
    /// Path to data directory
    #[arg(short, long, env = "RECIPE_MEMORY_DATA_DIR", default_value = "./recipe_memory_data")]
    data_dir: PathBuf,

    /// User whose history is read and written
    #[arg(short, long, env = "RECIPE_MEMORY_USER", default_value = "demo")]
    user: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a recipe summary
    Save {
        /// Localized summary text
        summary: String,

        /// Recipe title
        #[arg(short, long)]
        title: Option<String>,

        /// Source URL
        #[arg(long)]
        url: Option<String>,

        /// Ingredient (repeatable)
        #[arg(short, long = "ingredient")]
        ingredients: Vec<String>,

        /// Cuisine label (repeatable)
        #[arg(short, long)]
        cuisine: Vec<String>,

        /// Preparation time in minutes
        #[arg(short, long)]
        ready_in: Option<i64>,
    },

    /// Find previously saved summaries similar to a query
    Similar {
        /// Query text
        query: String,

        /// Maximum results (at least 1)
        #[arg(
            short,
            long,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        limit: Option<usize>,
    },

    /// List saved recipes
    History,

    /// Show preferences derived from history
    Prefs,

    /// Show personalized search parameters
    Params,

    /// Rebuild the similarity index from history
    Rebuild,

    /// Save every non-blank line of a file as a summary
    Seed {
        /// Input file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,recipe_memory=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MemoryConfig::builder()
        .data_dir(&cli.data_dir)
        .default_user(cli.user.as_str())
        .build();

    match cli.command {
        Commands::Save {
            summary,
            title,
            url,
            ingredients,
            cuisine,
            ready_in,
        } => {
            let mut metadata = SummaryMetadata::new()
                .with_ingredients(ingredients)
                .with_cuisine(cuisine);
            metadata.title = title;
            metadata.url = url;
            metadata.ready_in_minutes = ready_in;
            cmd_save(config, summary, metadata).await
        }
        Commands::Similar { query, limit } => cmd_similar(config, query, limit).await,
        Commands::History => cmd_history(config).await,
        Commands::Prefs => cmd_prefs(config).await,
        Commands::Params => cmd_params(config).await,
        Commands::Rebuild => cmd_rebuild(config).await,
        Commands::Seed { input } => cmd_seed(config, input).await,
    }
}

async fn cmd_save(
    config: MemoryConfig,
    summary: String,
    metadata: SummaryMetadata,
) -> anyhow::Result<()> {
    let memory = RecipeMemory::open(config).await?;
    let outcome = memory.save(&summary, metadata).await;
    print_outcome(&outcome);
    memory.close().await?;

    if let SaveOutcome::Failed(reason) = outcome {
        anyhow::bail!("save failed: {reason}");
    }
    Ok(())
}

async fn cmd_similar(
    config: MemoryConfig,
    query: String,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let memory = RecipeMemory::open(config).await?;
    let limit = limit.unwrap_or(memory.config().default_top_k);
    let results = memory.find_similar(&query, limit).await?;

    if results.is_empty() {
        println!("{}", "No similar recipes found".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} similar recipes:", results.len()).bold().green()
    );
    println!();
    for (i, text) in results.iter().enumerate() {
        println!("{}. {}", i + 1, text.chars().take(80).collect::<String>());
    }

    Ok(())
}

async fn cmd_history(config: MemoryConfig) -> anyhow::Result<()> {
    let user = config.default_user.clone();
    let memory = RecipeMemory::open(config).await?;
    let records = memory.history(&user).await?;

    if records.is_empty() {
        println!("{}", "No saved recipes".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} saved recipes for {}:", records.len(), user).bold()
    );
    println!();

    for record in &records {
        let title = if record.title.is_empty() {
            "(untitled)".dimmed()
        } else {
            record.title.as_str().cyan()
        };
        println!(
            "{} {} | {} | {} min | {}",
            format!("#{}", record.id).dimmed(),
            record.created_at.format("%Y-%m-%d %H:%M"),
            title,
            record.ready_in_minutes,
            record.summary.chars().take(50).collect::<String>()
        );
    }

    Ok(())
}

async fn cmd_prefs(config: MemoryConfig) -> anyhow::Result<()> {
    let user = config.default_user.clone();
    let memory = RecipeMemory::open(config).await?;
    let prefs = memory.analyze(&user).await?;

    println!("{}", format!("Preferences for {}", user).bold().underline());

    if prefs.is_empty() {
        println!("  {}", "No history yet".yellow());
        return Ok(());
    }

    println!("\n{}", "Top ingredients:".bold());
    for item in &prefs.top_ingredients {
        println!("  {}: {}", item.name.cyan(), item.count);
    }

    println!("\n{}", "Top cuisines:".bold());
    for item in &prefs.top_cuisines {
        println!("  {}: {}", item.name.cyan(), item.count);
    }

    match prefs.avg_time {
        Some(minutes) => println!("\n  Average time: ~{} min", minutes),
        None => println!("\n  Average time: {}", "unknown".dimmed()),
    }

    println!("\n  {}", recipe_memory::preference_summary(&prefs).italic());

    Ok(())
}

async fn cmd_params(config: MemoryConfig) -> anyhow::Result<()> {
    let user = config.default_user.clone();
    let memory = RecipeMemory::open(config).await?;
    let params = memory.build_personalized_params(&user).await?;

    println!("{}", serde_json::to_string_pretty(&params)?);

    Ok(())
}

async fn cmd_rebuild(config: MemoryConfig) -> anyhow::Result<()> {
    let embedder = Arc::new(HashEmbeddingProvider::new(config.embedding_dimension));
    let (memory, count) = RecipeMemory::open_and_rebuild_index(config, embedder).await?;
    memory.close().await?;

    println!(
        "{}",
        format!("Rebuilt similarity index with {} summaries", count)
            .green()
            .bold()
    );

    Ok(())
}

async fn cmd_seed(config: MemoryConfig, input: PathBuf) -> anyhow::Result<()> {
    let memory = RecipeMemory::open(config).await?;

    println!("{}", format!("Seeding from {:?}...", input).bold());

    let outcomes = memory.seed_from_file(&input).await?;
    let saved = outcomes.iter().filter(|o| o.is_saved()).count();
    let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    memory.close().await?;

    println!("  Saved:   {}", saved.to_string().green());
    println!("  Skipped: {}", skipped.to_string().yellow());
    if failed > 0 {
        println!("  Failed:  {}", failed.to_string().red());
    }

    Ok(())
}

fn print_outcome(outcome: &SaveOutcome) {
    let line = outcome.to_string();
    match outcome {
        SaveOutcome::Saved { .. } => println!("{}", line.green().bold()),
        SaveOutcome::SkippedEmpty | SaveOutcome::SkippedDuplicate => {
            println!("{}", line.yellow())
        }
        SaveOutcome::PartialFailure { .. } => println!("{}", line.red()),
        SaveOutcome::Failed(_) => println!("{}", line.red().bold()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn similar_rejects_zero_limit() {
        let parsed = Cli::try_parse_from(["recipe-memory", "similar", "ramen", "--limit", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn similar_accepts_positive_limit() {
        let cli = Cli::try_parse_from(["recipe-memory", "similar", "ramen", "-l", "2"]).unwrap();
        match cli.command {
            Commands::Similar { query, limit } => {
                assert_eq!(query, "ramen");
                assert_eq!(limit, Some(2));
            }
            _ => panic!("expected similar"),
        }
    }
}
