//! Operator commands for cloud storage offloading.
//!
//! Configuration comes from the environment (see `offload_core::Config`); only `migrate`
//! needs `DATABASE_URL`.

use clap::{Parser, Subcommand};
use offload_services::GenerateFileResponse;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "offload", about = "Offload file attachments to cloud storage")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Upload every local file to cloud storage and repoint its record
    Migrate {
        /// Concurrent uploads (defaults to MIGRATION_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Check that both buckets are reachable with the configured credentials
    TestConnection,
    /// Print a temporary signed URL for a stored reference
    Sign {
        /// Reference as stored in content_hash, e.g. private:2025/01/02/File/AB12CD34_a.pdf
        content_hash: String,
        /// Download name to suggest to the client
        #[arg(long)]
        file_name: Option<String>,
    },
    /// Encrypt a secret with ENCRYPTION_KEY for use in configuration
    EncryptSecret {
        value: String,
    },
    /// Print the storage configuration with secrets masked
    ShowConfig,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SignOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<GenerateFileResponse> for SignOutput {
    fn from(response: GenerateFileResponse) -> Self {
        match response {
            GenerateFileResponse::Redirect(url) => Self {
                url: Some(url),
                message: None,
            },
            GenerateFileResponse::Body(message) => Self {
                url: None,
                message: Some(message),
            },
        }
    }
}

/// Initialize tracing for CLI binaries. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so command output on stdout stays parseable.
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_migrate_workers() {
        let cli = Cli::try_parse_from(["offload", "migrate", "--workers", "8"]).unwrap();
        assert_eq!(cli.command, Commands::Migrate { workers: Some(8) });

        let cli = Cli::try_parse_from(["offload", "migrate"]).unwrap();
        assert_eq!(cli.command, Commands::Migrate { workers: None });
    }

    #[test]
    fn parse_sign() {
        let cli = Cli::try_parse_from([
            "offload",
            "sign",
            "private:2025/01/02/File/AB12CD34_a.pdf",
            "--file-name",
            "a.pdf",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::Sign {
                content_hash: "private:2025/01/02/File/AB12CD34_a.pdf".to_string(),
                file_name: Some("a.pdf".to_string()),
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["offload", "upload"]).is_err());
    }

    #[test]
    fn sign_output_shapes() {
        let out: SignOutput = GenerateFileResponse::Redirect("https://x/y".to_string()).into();
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            serde_json::json!({ "url": "https://x/y" })
        );

        let out: SignOutput = GenerateFileResponse::Body("Key not found.".to_string()).into();
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            serde_json::json!({ "message": "Key not found." })
        );
    }
}
