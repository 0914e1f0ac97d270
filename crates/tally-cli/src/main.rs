mod config;
mod customer_cmds;
mod draft_cmds;
mod erp_cmd;
mod serve;

use std::io;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use tally_core::erp::OdooClient;
use tally_core::notify::{DisabledNotifier, Notifier, WebhookNotifier};
use tally_db::pool;

use config::TallyConfig;

#[derive(Parser)]
#[command(name = "tally", about = "CFO-as-a-service back office: plan builder, ERP KPIs, and API")]
struct Cli {
    /// Database URL (overrides TALLY_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a tally config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/tally")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the tally database (requires config file or env vars)
    DbInit,
    /// Run the back-office HTTP API
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Customer management
    Customer {
        #[command(subcommand)]
        command: CustomerCommands,
    },
    /// Work on the plan-builder draft
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Query a customer's ERP
    Erp {
        #[command(subcommand)]
        command: ErpCommands,
    },
    /// Print shell completions to stdout
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a customer
    Add {
        /// Display name
        name: String,
        /// Contact email (unique)
        #[arg(long)]
        email: String,
        /// Company name
        #[arg(long, default_value = "")]
        company: String,
        /// Contact phone
        #[arg(long)]
        phone: Option<String>,
    },
    /// List customers
    List,
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// Show the draft, current stage, and price
    Show,
    /// Replace the draft with the contents of a JSON file
    Import {
        /// Path to a camelCase plan draft JSON file
        file: String,
    },
    /// Merge a JSON object into the draft (e.g. '{"basic":{"planName":"FY27"}}')
    Set {
        /// JSON merge patch
        json: String,
    },
    /// Validate the current stage and advance
    Next,
    /// Go back one stage
    Prev,
    /// Jump to a stage
    Goto {
        /// Stage name (basic, erp, kpis, milestones, assignments, governance, pricing, review)
        stage: String,
    },
    /// Validate every stage and create the plan
    Submit,
    /// Discard the draft
    Clear,
}

#[derive(Subcommand)]
pub enum ErpCommands {
    /// Compute the EBITDA margin for a connection over a date range
    Kpi {
        /// ERP connection ID
        connection_id: String,
        /// First accounting date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last accounting date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },
}

/// Webhook notifier when a URL is configured, otherwise the disabled one.
pub(crate) fn build_notifier(cfg: &TallyConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &cfg.webhook_url {
        Some(url) => {
            let http = reqwest::Client::builder()
                .timeout(cfg.erp_timeout)
                .build()
                .context("failed to build webhook HTTP client")?;
            Ok(Arc::new(WebhookNotifier::new(http, url.clone())))
        }
        None => Ok(Arc::new(DisabledNotifier)),
    }
}

/// Execute the `tally init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection::default(),
        erp: config::ErpSection::default(),
        drafts: config::DraftsSection::default(),
        notifications: config::NotificationsSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!();
    println!("Next: run `tally db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `tally db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = TallyConfig::resolve(cli_db_url)?;

    println!("Initializing tally database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("tally db-init complete.");
    Ok(())
}

async fn cmd_serve(
    cli_db_url: Option<&str>,
    bind: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let resolved = TallyConfig::resolve(cli_db_url)?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    let state = serve::AppState {
        pool: db_pool.clone(),
        erp: Arc::new(OdooClient::new(resolved.erp_timeout)?),
        notifier: build_notifier(&resolved)?,
    };
    if resolved.webhook_url.is_none() {
        tracing::info!("no webhook configured; notices will not be delivered");
    }

    let bind = bind.unwrap_or(resolved.bind);
    let port = port.unwrap_or(resolved.port);
    let result = serve::run_serve(state, &bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(cli.database_url.as_deref(), bind, port).await?;
        }
        Commands::Customer { command } => {
            let resolved = TallyConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = customer_cmds::run_customer_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Draft { command } => {
            let resolved = TallyConfig::resolve(cli.database_url.as_deref())?;
            draft_cmds::run_draft_command(command, &resolved).await?;
        }
        Commands::Erp { command } => {
            let resolved = TallyConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = erp_cmd::run_erp_command(command, &db_pool, &resolved).await;
            db_pool.close().await;
            result?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tally", &mut io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that mutate process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_draft_goto_and_global_db_url() {
        let cli = Cli::try_parse_from([
            "tally",
            "--database-url",
            "postgresql://db/tally",
            "draft",
            "goto",
            "pricing",
        ])
        .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("postgresql://db/tally"));
        match cli.command {
            Commands::Draft {
                command: DraftCommands::Goto { stage },
            } => assert_eq!(stage, "pricing"),
            _ => panic!("expected draft goto"),
        }
    }

    #[test]
    fn erp_kpi_requires_range() {
        assert!(Cli::try_parse_from(["tally", "erp", "kpi", "abc", "--start", "2026-01-01"]).is_err());
    }
}
