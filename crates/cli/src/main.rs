use std::{path::PathBuf, sync::Arc};

use {
    clap::Parser,
    secrecy::Secret,
    sqlx::sqlite::SqliteConnectOptions,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    taskling_tasks::{SqliteTaskStore, TaskStore},
    taskling_telegram::{BotConfig, start_polling},
};

#[derive(Parser)]
#[command(name = "taskling", about = "Taskling — personal task-capture bot for Telegram")]
struct Cli {
    /// Bot token from @BotFather.
    #[arg(long, env = "TASKLING_BOT_TOKEN", hide_env_values = true)]
    token: String,

    /// Path to the SQLite database file.
    #[arg(long, env = "TASKLING_DB", default_value = "taskling.db")]
    db: PathBuf,

    /// Minutes of inactivity before an unfinished capture dialog is discarded.
    #[arg(long, default_value_t = 30)]
    session_ttl_mins: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads the environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli);

    let options = SqliteConnectOptions::new()
        .filename(&cli.db)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await?;
    SqliteTaskStore::init(&pool).await?;
    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(pool));
    info!(db = %cli.db.display(), "task store ready");

    let config = BotConfig {
        token: Secret::new(cli.token.clone()),
        session_ttl_secs: cli.session_ttl_mins * 60,
    };
    let cancel = start_polling(config, store).await?;

    info!("taskling is running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    cancel.cancel();

    Ok(())
}
