//! # Che.Comex CLI (`comex`)
//!
//! ## Usage
//!
//! ```bash
//! comex --config ./config/comex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `comex init` | Create the SQLite database and run schema migrations |
//! | `comex seed` | Load reference data and demo trade flows |
//! | `comex import <csv>` | Import trade flows from a CSV file |
//! | `comex classify "<text>"` | Classify a product description |
//! | `comex analyze` | Rank destination markets for a product |
//! | `comex documents` | Documents and tariff for one destination |
//! | `comex stats` | Database summary |
//! | `comex serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use comex::analysis::{run_analyze, AnalysisQuery};
use comex::{classifier, config, documents, import, logging, migrate, seed, server, stats};

/// Che.Comex: export market intelligence from the command line.
#[derive(Parser)]
#[command(
    name = "comex",
    about = "Che.Comex: HS classification, regulatory lookup and export market ranking",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/comex.toml")]
    config: PathBuf,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Load built-in tariffs and rules plus deterministic demo trade flows.
    ///
    /// Replaces rows from the previous seed run.
    Seed,

    /// Import trade flows from a CSV file.
    Import {
        /// CSV with header hs_code,origin_country,destination_country,year,volume,value_usd.
        path: PathBuf,

        /// Delete rows previously imported from a file with the same name.
        #[arg(long)]
        replace: bool,
    },

    /// Classify a free-text product description into an HS code.
    Classify { text: String },

    /// Rank destination markets for a product.
    Analyze {
        /// HS code (2 to 10 digits; dots allowed).
        #[arg(long)]
        hs_code: Option<String>,

        /// Product description, classified when no HS code is given.
        #[arg(long)]
        product: Option<String>,

        /// Exporting country (code or name).
        #[arg(long)]
        origin: Option<String>,

        #[arg(long)]
        fob_price: Option<f64>,

        #[arg(long)]
        logistics_cost: Option<f64>,

        /// Only use trade flows from this year.
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        limit: Option<usize>,

        /// Print the JSON response instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show required documents, tariff and non-tariff measures.
    Documents {
        #[arg(long)]
        hs_code: String,

        /// Destination country (code or name).
        #[arg(long)]
        country: String,

        #[arg(long)]
        origin: Option<String>,
    },

    /// Show database statistics.
    Stats,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Seed => {
            seed::run_seed(&cfg).await?;
        }
        Commands::Import { path, replace } => {
            import::run_import(&cfg, &path, replace).await?;
        }
        Commands::Classify { text } => {
            classifier::run_classify(&cfg, &text).await?;
        }
        Commands::Analyze {
            hs_code,
            product,
            origin,
            fob_price,
            logistics_cost,
            year,
            limit,
            json,
        } => {
            let query = AnalysisQuery {
                hs_code,
                product,
                origin,
                fob_price,
                logistics_cost,
                year,
                limit,
            };
            run_analyze(&cfg, &query, json).await?;
        }
        Commands::Documents {
            hs_code,
            country,
            origin,
        } => {
            documents::run_documents(&cfg, &hs_code, &country, origin.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
