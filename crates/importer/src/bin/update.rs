use clap::{Parser, Subcommand};
use importer::{FeedConfig, Pipeline, PipelineConfig, ResultsFeedClient, WholeHistoryRating};
use importer::config::{
    DEFAULT_EVENT_LIST_LIMIT, DEFAULT_FEED_BASE_URL, DEFAULT_MATCH_PAGE_SIZE, DEFAULT_MEN_W2,
    DEFAULT_WOMEN_W2,
};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use storage::Database;
use storage::dto::competitor::Translations;
use storage::repository::competitor::CompetitorRepository;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "update")]
#[command(about = "Table tennis results sync and rating update", long_about = None)]
#[command(version)]
struct Cli {
    /// Without a subcommand, performs one full update run.
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://data.db")]
    database_url: String,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load localized competitor and association names from a JSON file
    ImportTranslations { file: PathBuf },
}

#[derive(clap::Args)]
struct RunArgs {
    #[arg(long, env = "FEED_BASE_URL", default_value = DEFAULT_FEED_BASE_URL)]
    feed_base_url: String,

    #[arg(long, env = "FEED_USERNAME", default_value = "")]
    feed_username: String,

    #[arg(long, env = "FEED_PASSWORD", default_value = "", hide_env_values = true)]
    feed_password: String,

    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    #[arg(long, env = "MEN_W2", default_value_t = DEFAULT_MEN_W2)]
    men_w2: f64,

    #[arg(long, env = "WOMEN_W2", default_value_t = DEFAULT_WOMEN_W2)]
    women_w2: f64,

    #[arg(long, env = "MATCH_PAGE_SIZE", default_value_t = DEFAULT_MATCH_PAGE_SIZE)]
    match_page_size: u32,

    #[arg(long, env = "EVENT_LIST_LIMIT", default_value_t = DEFAULT_EVENT_LIST_LIMIT)]
    event_list_limit: u32,

    #[arg(long, env = "POLITENESS_MAX_DELAY_MS", default_value_t = 1000)]
    politeness_max_delay_ms: u64,

    /// First weekly boundary to backfill when no snapshot exists yet
    #[arg(long, env = "HISTORY_START")]
    history_start: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("update={},importer={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let outcome = match cli.command {
        Some(Commands::ImportTranslations { file }) => {
            handle_import_translations(file, &cli.database_url).await
        }
        None => handle_run(cli.run, &cli.database_url).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn handle_run(
    args: RunArgs,
    database_url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let db = Database::new(database_url).await?;
    db.run_migrations().await?;

    let feed_config = FeedConfig {
        base_url: args.feed_base_url,
        username: args.feed_username,
        password: args.feed_password,
        event_list_limit: args.event_list_limit,
    };
    let feed = ResultsFeedClient::new(&feed_config)?;
    if !feed_config.username.is_empty() {
        tracing::info!("Logging in to {}", feed_config.base_url);
        if let Err(e) = feed.login(&feed_config.username, &feed_config.password).await {
            tracing::error!(kind = %e.kind(), "Run failed: {}", e);
            return Ok(false);
        }
    }

    let config = PipelineConfig {
        match_page_size: args.match_page_size,
        politeness_max_delay: Duration::from_millis(args.politeness_max_delay_ms),
        men_w2: args.men_w2,
        women_w2: args.women_w2,
        output_dir: args.output_dir,
        history_start: args.history_start,
    };

    let pipeline: Pipeline<_, WholeHistoryRating> = Pipeline::new(db, feed, config);
    Ok(pipeline.run().await)
}

async fn handle_import_translations(
    file: PathBuf,
    database_url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    tracing::info!("Loading translations from: {}", file.display());

    let content = tokio::fs::read_to_string(&file).await?;
    let translations: Translations = serde_json::from_str(&content)?;

    let db = Database::new(database_url).await?;
    db.run_migrations().await?;

    let written = CompetitorRepository::new(db.pool())
        .upsert_translations(&translations)
        .await?;
    tracing::info!(
        "Stored {} competitor and {} association names ({} rows written)",
        translations.competitors.len(),
        translations.associations.len(),
        written
    );

    Ok(true)
}
