use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use txl_ledger::DEFAULT_ACCOUNT_LIMIT;
use txl_types::Amount;

#[derive(Parser)]
#[command(name = "txl", about = "TXL transaction ledger and audit log", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Journal file, overriding `store_path` from the config
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record and inspect transactions
    #[command(subcommand)]
    Tx(TxCommand),
    /// Record and inspect audit log entries
    #[command(subcommand)]
    Audit(AuditCommand),
}

#[derive(Subcommand)]
pub enum TxCommand {
    /// Record a new transaction
    Create(TxCreateArgs),
    /// Show the latest revision of a transaction
    Show { id: String },
    /// Check whether a transaction id is taken
    Exists { id: String },
    /// Show every stored revision of a transaction
    History { id: String },
    /// List transactions touching an account, newest first
    Account {
        account_id: String,
        /// Maximum number of transactions to list
        #[arg(long, default_value_t = DEFAULT_ACCOUNT_LIMIT)]
        limit: usize,
    },
    /// Print the content hash of a transaction
    Hash { id: String },
    /// Check a transaction against a previously printed hash
    Verify { id: String, expected_hash: String },
}

#[derive(Args)]
pub struct TxCreateArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long = "type")]
    pub txn_type: String,
    #[arg(long)]
    pub amount: Amount,
    #[arg(long)]
    pub currency: String,
    #[arg(long, default_value = "")]
    pub from: String,
    #[arg(long, default_value = "")]
    pub to: String,
    /// RFC-3339 event time
    #[arg(long)]
    pub timestamp: String,
    #[arg(long, default_value = "PENDING")]
    pub status: String,
    #[arg(long, default_value = "")]
    pub metadata: String,
}

#[derive(Subcommand)]
pub enum AuditCommand {
    /// Record an audit entry (rewrites append a revision)
    Create(AuditCreateArgs),
    /// Show the latest revision of an audit entry
    Show { id: String },
    /// Show every stored revision of an audit entry
    History { id: String },
}

#[derive(Args)]
pub struct AuditCreateArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long)]
    pub action: String,
    #[arg(long)]
    pub actor: String,
    #[arg(long)]
    pub resource_type: String,
    #[arg(long)]
    pub resource_id: String,
    #[arg(long, default_value = "")]
    pub before: String,
    #[arg(long, default_value = "")]
    pub after: String,
    /// RFC-3339 event time
    #[arg(long)]
    pub timestamp: String,
}
