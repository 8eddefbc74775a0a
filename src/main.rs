//! # Triage CLI (`triage`)
//!
//! Command-line frontend for the diagnosis-assistant core. History commands
//! work against the configured blob backend; symptom, diagnosis, and issue
//! commands additionally talk to the external knowledge service.
//!
//! ## Usage
//!
//! ```bash
//! triage --config ./config/triage.toml <command>
//! ```
//!
//! Caller identity comes from `--token <bearer-jwt>` (decoded, not verified
//! — verification belongs to the identity provider) or from explicit
//! `--email/--birthdate/--gender` flags.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `triage history add` | Record a diagnosis session |
//! | `triage history list` | Print the caller's history |
//! | `triage history confirm` | Confirm whether a diagnosis worked |
//! | `triage symptoms` | Print the symptom catalog (cache-backed) |
//! | `triage diagnosis` | Request diagnosis proposals for symptom ids |
//! | `triage issue` | Print detail for one issue |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use triage_kit::catalog::CatalogCache;
use triage_kit::config::{self, Config};
use triage_kit::history::HistoryStore;
use triage_kit::identity::UserIdentity;
use triage_kit::knowledge::KnowledgeClient;
use triage_kit::models::Gender;
use triage_kit::ops;
use triage_kit::storage::BlobStore;
use triage_kit::storage_fs::FsBlobStore;
use triage_kit::storage_s3::S3BlobStore;

/// Triage CLI — diagnosis history and symptom lookups over blob storage.
#[derive(Parser)]
#[command(
    name = "triage",
    about = "Diagnosis-assistant core: per-user history and cached medical knowledge lookups",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/triage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Identity flags shared by commands that act on behalf of a user.
#[derive(Args, Clone)]
struct IdentityArgs {
    /// Bearer identity token; its payload is decoded (not verified) for
    /// email, birthdate, and gender.
    #[arg(long, conflicts_with_all = ["email", "birthdate", "gender"])]
    token: Option<String>,

    /// User email (with --birthdate and --gender, instead of --token).
    #[arg(long, requires = "birthdate", requires = "gender")]
    email: Option<String>,

    /// User birthdate, YYYY-MM-DD.
    #[arg(long)]
    birthdate: Option<NaiveDate>,

    /// User gender: male or female.
    #[arg(long)]
    gender: Option<Gender>,
}

impl IdentityArgs {
    fn resolve(&self) -> anyhow::Result<UserIdentity> {
        if let Some(token) = &self.token {
            return Ok(UserIdentity::from_unverified_token(token)?);
        }
        match (&self.email, &self.birthdate, &self.gender) {
            (Some(email), Some(birthdate), Some(gender)) => Ok(UserIdentity {
                email: email.clone(),
                birthdate: *birthdate,
                gender: *gender,
            }),
            _ => anyhow::bail!("provide --token or all of --email, --birthdate, --gender"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnosis-session history for one user.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Print the full symptom catalog, served from the snapshot cache when
    /// it is less than a day old.
    Symptoms {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Request diagnosis proposals for a set of symptom ids.
    Diagnosis {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Comma-separated symptom ids, e.g. `10,45,231`.
        #[arg(long, value_delimiter = ',', required = true)]
        symptoms: Vec<i64>,
    },

    /// Print detail for a single issue.
    Issue {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Issue id as returned in diagnosis results.
        issue_id: i64,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Record a new diagnosis session.
    Add {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Issue id the session concluded with.
        #[arg(long)]
        issue_id: i64,

        /// Whether the diagnosis worked, if already known.
        #[arg(long)]
        functionality: Option<bool>,
    },

    /// Print the user's history, newest first.
    List {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Set the functionality flag on a past session.
    Confirm {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Entry id as returned by `history add` / `history list`.
        entry_id: String,

        /// Whether the diagnosis worked.
        #[arg(long)]
        functionality: bool,
    },
}

/// Build the configured blob backend.
fn build_blobs(cfg: &Config) -> anyhow::Result<Arc<dyn BlobStore>> {
    match cfg.storage.backend.as_str() {
        "filesystem" => {
            let fs_cfg = cfg
                .storage
                .filesystem
                .as_ref()
                .context("missing [storage.filesystem] configuration")?;
            Ok(Arc::new(FsBlobStore::new(fs_cfg.root.clone())))
        }
        "s3" => {
            let s3_cfg = cfg
                .storage
                .s3
                .as_ref()
                .context("missing [storage.s3] configuration")?;
            Ok(Arc::new(S3BlobStore::from_env(s3_cfg.clone())?))
        }
        other => anyhow::bail!("unknown storage backend '{}'", other),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let blobs = build_blobs(&cfg)?;

    match cli.command {
        Commands::History { action } => {
            let store = HistoryStore::new(blobs);
            match action {
                HistoryAction::Add {
                    identity,
                    issue_id,
                    functionality,
                } => {
                    let id = identity.resolve()?;
                    let doc = ops::add_history_entry(&store, &id, issue_id, functionality).await?;
                    print_json(&doc)?;
                }
                HistoryAction::List { identity } => {
                    let id = identity.resolve()?;
                    let doc = ops::get_history(&store, &id).await?;
                    print_json(&doc)?;
                }
                HistoryAction::Confirm {
                    identity,
                    entry_id,
                    functionality,
                } => {
                    let id = identity.resolve()?;
                    let doc =
                        ops::confirm_history_entry(&store, &id, &entry_id, functionality).await?;
                    print_json(&doc)?;
                }
            }
        }
        Commands::Symptoms { identity } => {
            // Identity is resolved for parity with the deployed API, where
            // every route sits behind the identity provider.
            identity.resolve()?;
            let cache = CatalogCache::with_max_age(
                blobs,
                chrono::Duration::hours(cfg.catalog.max_age_hours),
            );
            let mut client = KnowledgeClient::from_env(cfg.knowledge.clone())?;
            let symptoms = ops::get_symptoms(&cache, &mut client).await?;
            print_json(&symptoms)?;
        }
        Commands::Diagnosis { identity, symptoms } => {
            let id = identity.resolve()?;
            let mut client = KnowledgeClient::from_env(cfg.knowledge.clone())?;
            let result = ops::get_diagnosis(&mut client, &id, &symptoms).await?;
            print_json(&result)?;
        }
        Commands::Issue { identity, issue_id } => {
            identity.resolve()?;
            let mut client = KnowledgeClient::from_env(cfg.knowledge.clone())?;
            let result = ops::get_issue(&mut client, issue_id).await?;
            print_json(&result)?;
        }
    }

    Ok(())
}
