//! offload: operator CLI for cloud storage offloading.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use offload_cli::{init_tracing, Cli, Commands, SignOutput};
use offload_core::{Config, EncryptionService, FileRepository, InMemoryFileRepository};
use offload_db::{setup_database, PgFileRepository};
use offload_services::CloudStorage;
use serde::Serialize;

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn cloud_storage(
    config: &Config,
    files: Arc<dyn FileRepository>,
    cipher: Option<&EncryptionService>,
) -> anyhow::Result<CloudStorage> {
    CloudStorage::from_config(config, files, cipher, None)
        .context("Failed to configure cloud storage")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;
    let cipher = EncryptionService::from_env()?;

    match cli.command {
        Commands::Migrate { workers } => {
            let pool = setup_database(config.database_url()?).await?;
            let files = Arc::new(PgFileRepository::new(pool));
            let cloud = cloud_storage(&config, files, cipher.as_ref())?;

            let workers = workers.unwrap_or(config.migration_workers);
            let report = cloud.migrate_with_workers(workers).await?;
            print_json(&report)?;
        }
        Commands::TestConnection => {
            // No record access needed.
            let files = Arc::new(InMemoryFileRepository::default());
            let cloud = cloud_storage(&config, files, cipher.as_ref())?;
            print_json(&cloud.test_connection().await)?;
        }
        Commands::Sign {
            content_hash,
            file_name,
        } => {
            let files = Arc::new(InMemoryFileRepository::default());
            let cloud = cloud_storage(&config, files, cipher.as_ref())?;
            let response = cloud
                .generate_file(Some(&content_hash), file_name.as_deref())
                .await?;
            print_json(&SignOutput::from(response))?;
        }
        Commands::EncryptSecret { value } => {
            let cipher = cipher.context("ENCRYPTION_KEY must be set to encrypt secrets")?;
            let encrypted = cipher.encrypt(&value)?;
            print_json(&serde_json::json!({ "encrypted": encrypted }))?;
        }
        Commands::ShowConfig => {
            print_json(&config.storage.masked())?;
        }
    }

    Ok(())
}
