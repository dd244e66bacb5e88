// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// pgshift - Declarative PostgreSQL schema migrations
///
/// Computes the SQL needed to move a database from its recorded baseline
/// metadata tree to a target metadata tree, and applies it in one transaction.
#[derive(Parser, Debug)]
#[command(name = "pgshift")]
#[command(author = "pgshift Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative PostgreSQL schema migration compiler")]
#[command(long_about = "pgshift - Declarative PostgreSQL schema migrations

Compares two metadata trees (the recorded baseline and a target snapshot)
and emits an ordered, idempotent list of PostgreSQL statements.

pgshift helps you:
  • Preview the SQL a schema change needs before touching the database
  • Detect renames through oldName / oldSchemaName hints
  • Catch malformed relations and duplicate constraint names early
  • Apply the change and record the new baseline atomically")]
#[command(propagate_version = true)]
#[command(after_help = "GETTING STARTED:
  1. Create a config file:          pgshift init --database app_dev
  2. Describe the target schema:    Write schema.json (or schema.yaml)
  3. Preview the migration:         pgshift plan --to schema.json
  4. Apply it:                      pgshift apply --to schema.json
  5. Check the recorded baseline:   pgshift status --to schema.json

For detailed help on each command, use: pgshift <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a pgshift.yaml config file
    ///
    /// EXAMPLES:
    ///   # Local development database
    ///   pgshift init --database app_dev
    ///
    ///   # Named environment with explicit connection
    ///   pgshift init --env staging --host db.internal --user app --database app
    ///
    ///   # Overwrite an existing config
    ///   pgshift init --database app_dev --force
    Init {
        /// Environment name
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// Database name
        #[arg(short, long, value_name = "NAME")]
        database: String,

        /// Database host
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Database port
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,

        /// Database user
        #[arg(long, value_name = "USER")]
        user: Option<String>,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Compute the migration SQL without applying it
    ///
    /// The starting tree is read from --from, or from the latest recorded
    /// baseline of --env when --from is omitted.
    ///
    /// EXAMPLES:
    ///   # Compare two snapshot files
    ///   pgshift plan --from previous.json --to schema.json
    ///
    ///   # Compare against the development baseline
    ///   pgshift plan --to schema.json
    ///
    ///   # Write the statements to a file
    ///   pgshift plan --to schema.json --output migration.sql
    Plan {
        /// Target snapshot (JSON or YAML)
        #[arg(short, long, value_name = "FILE")]
        to: PathBuf,

        /// Starting snapshot (defaults to the recorded baseline)
        #[arg(short, long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Environment whose baseline is used when --from is omitted
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// SQL file with statements to run after the migration
        #[arg(long, value_name = "FILE")]
        seed: Option<PathBuf>,

        /// Write the statements to a file instead of printing them
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Apply the migration to the database and record the new baseline
    ///
    /// EXAMPLES:
    ///   # Apply to development
    ///   pgshift apply --to schema.json
    ///
    ///   # Preview only
    ///   pgshift apply --to schema.json --dry-run
    ///
    ///   # Apply to production with a statement timeout
    ///   pgshift apply --to schema.json --env production --timeout 30
    Apply {
        /// Target snapshot (JSON or YAML)
        #[arg(short, long, value_name = "FILE")]
        to: PathBuf,

        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// Dry run - show SQL without executing
        #[arg(long)]
        dry_run: bool,

        /// Statement timeout in seconds (overrides the config)
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// SQL file with statements to run after the migration
        #[arg(long, value_name = "FILE")]
        seed: Option<PathBuf>,

        /// Apply even when structural errors were reported
        #[arg(long)]
        allow_errors: bool,
    },

    /// Check a target snapshot for structural errors and policy warnings
    ///
    /// EXAMPLES:
    ///   # Validate a fresh target
    ///   pgshift validate --to schema.json
    ///
    ///   # Validate a change between two snapshots
    ///   pgshift validate --from previous.json --to schema.json
    Validate {
        /// Target snapshot (JSON or YAML)
        #[arg(short, long, value_name = "FILE")]
        to: PathBuf,

        /// Starting snapshot (defaults to an empty tree)
        #[arg(short, long, value_name = "FILE")]
        from: Option<PathBuf>,
    },

    /// Show the recorded baseline
    ///
    /// With --to, also reports whether the target differs from the baseline.
    ///
    /// EXAMPLES:
    ///   pgshift status
    ///   pgshift status --env production --to schema.json
    Status {
        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// Target snapshot to compare against the baseline
        #[arg(short, long, value_name = "FILE")]
        to: Option<PathBuf>,
    },
}
