//! tagsync - music taxonomy sync tool
//!
//! Imports tabular music data, builds the tag taxonomy, reconciles tags
//! onto items, and mirrors the tagging server into a local SQLite store.

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tagsync::cli::{Cli, Command};
use tagsync::db::{self, admin};
use tagsync::services::csv_source::TabularSource;
use tagsync::services::{data_importer, mirror, reconciler, taxonomy_importer};
use tagsync::services::tagging_client::TaggingClient;
use tagsync::services::taxonomy_importer::ImportOptions;
use tagsync_common::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref());

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, finishing current step");
            cancel_on_signal.cancel();
        }
    });

    match cli.command {
        Command::SetupDb => {
            let path = admin::database_path(&data_dir, &cli.database)?;
            let pool = db::init_database_pool(&path).await?;
            pool.close().await;
            tracing::info!(database = %path.display(), "Database ready");
        }
        Command::CreateDb => {
            let path = admin::create_database(&data_dir, &cli.database).await?;
            tracing::info!(database = %path.display(), "Database created");
        }
        Command::DropDb => {
            admin::drop_database(&data_dir, &cli.database).await?;
            tracing::info!(database = %cli.database, "Database dropped");
        }
        Command::ListDbs => {
            for name in admin::list_databases(&data_dir).await? {
                println!("{}", name);
            }
        }
        Command::ImportData { csv } => {
            let source = TabularSource::from_csv_path(&csv)
                .with_context(|| format!("loading {}", csv.display()))?;
            let pool = open_pool(&data_dir, &cli.database).await?;
            let stats = data_importer::import_music_files(&pool, &source).await?;
            println!("{}", stats.display_string());
        }
        Command::ImportTags { csv, target } => {
            let source = TabularSource::from_csv_path(&csv)
                .with_context(|| format!("loading {}", csv.display()))?;
            let options = ImportOptions::default();
            let stats = if target == "remote" {
                let client = tagging_client(&cli.server)?;
                taxonomy_importer::import_remote(&client, &source, &options).await?
            } else {
                let pool = open_pool(&data_dir, &cli.database).await?;
                taxonomy_importer::import_local(&pool, &source, &options).await?
            };
            println!("{}", stats.display_string());
        }
        Command::TagItems { csv } => {
            let source = TabularSource::from_csv_path(&csv)
                .with_context(|| format!("loading {}", csv.display()))?;
            let pool = open_pool(&data_dir, &cli.database).await?;
            let stats =
                reconciler::reconcile_local(&pool, &source, &ImportOptions::default(), &cancel)
                    .await?;
            println!("{}", stats.display_string());
        }
        Command::PushTags => {
            let pool = open_pool(&data_dir, &cli.database).await?;
            let client = tagging_client(&cli.server)?;
            let stats = reconciler::push_item_tags(&pool, &client, &cancel).await?;
            println!("{}", stats.display_string());
        }
        Command::Clone => {
            let pool = open_pool(&data_dir, &cli.database).await?;
            let client = tagging_client(&cli.server)?;
            mirror::clone_all(&pool, &client, &cancel).await?;
        }
        Command::CloneItems => {
            let pool = open_pool(&data_dir, &cli.database).await?;
            let client = tagging_client(&cli.server)?;
            mirror::clone_items(&pool, &client, &cancel).await?;
        }
        Command::Verify { sample_size } => {
            let pool = open_pool(&data_dir, &cli.database).await?;
            let client = tagging_client(&cli.server)?;
            let report = mirror::verify_sample(&pool, &client, sample_size).await?;
            println!("{}", report.display_string());
            if !report.is_clean() {
                anyhow::bail!("mirror does not match server");
            }
        }
    }

    Ok(())
}

async fn open_pool(
    data_dir: &std::path::Path,
    database: &str,
) -> anyhow::Result<sqlx::SqlitePool> {
    let path = admin::database_path(data_dir, database)?;
    let pool = db::init_database_pool(&path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(pool)
}

fn tagging_client(cli_server: &Option<String>) -> anyhow::Result<TaggingClient> {
    let url = config::resolve_server_url(cli_server.as_deref());
    tracing::info!(server = %url, "Using tagging server");
    Ok(TaggingClient::new(&url)?)
}
