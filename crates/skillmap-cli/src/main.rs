mod config;
mod generate_cmd;
mod progress_cmd;
mod serve_cmd;
mod show_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use skillmap_core::SkillMapService;
use skillmap_core::generator::LlmGenerator;
use skillmap_core::store::{MemoryPlanStore, PgPlanStore, PlanStore};
use skillmap_db::config::DbConfig;
use skillmap_db::pool;

use config::SkillmapConfig;
use generate_cmd::GenerateOptions;
use progress_cmd::ProgressOptions;

#[derive(Parser)]
#[command(
    name = "skillmap",
    about = "Decompose skills into learning plans and track progress"
)]
struct Cli {
    /// Database URL (overrides SKILLMAP_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a skillmap config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Model name for plan generation
        #[arg(long)]
        model: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and run migrations
    DbInit,
    /// Run the HTTP API
    Serve {
        /// Address to bind (default from config, else 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (default from config, else 8000)
        #[arg(long)]
        port: Option<u16>,
        /// Keep plans in memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,
    },
    /// Generate a skill map (or a 30-day program) and store it
    Generate {
        /// Skill to learn, e.g. "Rust"
        skill: String,
        /// Generate a 30-day program instead of a skill tree
        #[arg(long)]
        program: bool,
        /// Study hours available per week
        #[arg(long)]
        hours_per_week: Option<f64>,
        /// Desired time frame in days
        #[arg(long)]
        time_frame: Option<u32>,
        /// Owner recorded on the plan
        #[arg(long)]
        user_id: Option<String>,
        /// Print the stored plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a stored plan (omit the id to list plans)
    Show {
        /// Plan ID
        id: Option<String>,
        /// The id refers to a 30-day program
        #[arg(long)]
        program: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record progress against a stored plan
    Progress {
        /// Plan ID
        id: String,
        /// The id refers to a 30-day program
        #[arg(long)]
        program: bool,
        /// NODE_ID=PERCENT, repeatable
        #[arg(long = "node")]
        nodes: Vec<String>,
        /// DAY=PERCENT, repeatable (programs)
        #[arg(long = "day")]
        days: Vec<String>,
        /// Context-change impact factor (-1.0 to 1.0), repeatable
        #[arg(long = "impact", allow_hyphen_values = true)]
        impacts: Vec<f64>,
        /// Change type recorded with --impact
        #[arg(long, default_value = "schedule_change")]
        reason: String,
    },
}

/// Execute the `skillmap init` command: write config file.
fn cmd_init(db_url: &str, model: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut llm = config::LlmSection::default();
    if let Some(model) = model {
        llm.model = model;
    }
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        llm,
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  llm.model = {}", cfg.llm.model);
    println!();
    println!("Set {} (or llm.api_key) before generating plans.", config::API_KEY_ENV);
    println!("Next: run `skillmap db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `skillmap db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &SkillmapConfig) -> anyhow::Result<()> {
    println!("Initializing skillmap database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("skillmap db-init complete.");
    Ok(())
}

fn build_service(
    resolved: &SkillmapConfig,
    store: Arc<dyn PlanStore>,
) -> anyhow::Result<SkillMapService> {
    let generator = LlmGenerator::new(resolved.llm_config.clone(), resolved.fallback)?;
    Ok(SkillMapService::new(store, Arc::new(generator)))
}

/// Connect to PostgreSQL, run `f` against a service backed by it, and close
/// the pool whatever the outcome.
async fn with_pg_service<F, Fut>(resolved: &SkillmapConfig, f: F) -> anyhow::Result<()>
where
    F: FnOnce(SkillMapService) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let store = Arc::new(PgPlanStore::new(db_pool));
    let result = match build_service(resolved, store.clone()) {
        Ok(service) => f(service).await,
        Err(e) => Err(e),
    };
    store.pool().close().await;
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
        Commands::Init {
            db_url,
            model,
            force,
        } => {
            cmd_init(&db_url, model, force)?;
        }
        Commands::DbInit => {
            let resolved = SkillmapConfig::resolve(cli.database_url.as_deref())?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Serve {
            bind,
            port,
            in_memory,
        } => {
            let mut resolved = SkillmapConfig::resolve(cli.database_url.as_deref())?;
            if let Some(bind) = bind {
                resolved.server.bind = bind;
            }
            if let Some(port) = port {
                resolved.server.port = port;
            }
            if in_memory {
                info!("using in-memory plan store; plans are lost on exit");
                let service = build_service(&resolved, Arc::new(MemoryPlanStore::new()))?;
                serve_cmd::run_serve(service, &resolved.server).await?;
            } else {
                let settings = resolved.server.clone();
                with_pg_service(&resolved, |service| async move {
                    serve_cmd::run_serve(service, &settings).await
                })
                .await?;
            }
        }
        Commands::Generate {
            skill,
            program,
            hours_per_week,
            time_frame,
            user_id,
            json,
        } => {
            let resolved = SkillmapConfig::resolve(cli.database_url.as_deref())?;
            let options = GenerateOptions {
                program,
                hours_per_week,
                time_frame,
                user_id,
                json,
            };
            with_pg_service(&resolved, |service| async move {
                generate_cmd::run_generate(&service, &skill, &options).await
            })
            .await?;
        }
        Commands::Show { id, program, json } => {
            let resolved = SkillmapConfig::resolve(cli.database_url.as_deref())?;
            with_pg_service(&resolved, |service| async move {
                show_cmd::run_show(&service, id.as_deref(), program, json).await
            })
            .await?;
        }
        Commands::Progress {
            id,
            program,
            nodes,
            days,
            impacts,
            reason,
        } => {
            let resolved = SkillmapConfig::resolve(cli.database_url.as_deref())?;
            let options = ProgressOptions {
                nodes,
                days,
                impacts,
                reason,
            };
            with_pg_service(&resolved, |service| async move {
                progress_cmd::run_progress(&service, &id, program, &options).await
            })
            .await?;
        }
    }

    Ok(())
}
