//! Clinic Stock CLI - migrations, master data, stock movements and reports.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! stock-cli migrate
//!
//! # Load the medicine master list
//! stock-cli --actor head@clinic.test medicine import medicines.yaml
//!
//! # Receive a delivery
//! stock-cli --actor nurse@clinic.test receive -m PARA500 -l L2301 -q 200 --exp 2026-03-31
//!
//! # Dispense two medicines at once (all or nothing)
//! stock-cli --actor nurse@clinic.test dispense --line PARA500:20 --line AMOX250:10
//!
//! # Correct a ledger entry
//! stock-cli --actor nurse@clinic.test tx edit 42 --quantity 15
//!
//! # Monthly report for May 2025
//! stock-cli report monthly --month 2025-05
//! ```
//!
//! # Environment Variables
//!
//! - `STOCK_DATABASE_URL` - `PostgreSQL` connection string (required)
//! - `STOCK_ACTOR` / `STOCK_ROLE` - Default for `--actor` / `--role`
//! - The `STOCK_*` business settings read by the server

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use clinic_stock_core::{LotCode, MedicineCategory, MedicineId, StaffRole};
use clinic_stock_server::models::{ReportMonth, RequestContext};

mod commands;

#[derive(Parser)]
#[command(name = "stock-cli")]
#[command(author, version, about = "Clinic Stock CLI tools")]
struct Cli {
    /// Who is running the command (recorded on ledger entries)
    #[arg(long, global = true, env = "STOCK_ACTOR", default_value = "cli")]
    actor: String,

    /// Privilege level (`staff` or `admin`)
    #[arg(long, global = true, env = "STOCK_ROLE", default_value = "staff")]
    role: StaffRole,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the medicine master list
    Medicine {
        #[command(subcommand)]
        action: MedicineAction,
    },
    /// Receive a delivery into a lot
    Receive {
        #[command(flatten)]
        lot: LotArgs,

        /// Units received
        #[arg(short, long)]
        quantity: i64,
    },
    /// Load an opening balance from earlier records (admin)
    OpeningBalance {
        #[command(flatten)]
        lot: LotArgs,

        /// Signed units carried over
        #[arg(short, long, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Dispense stock first-expired-first-out
    Dispense {
        /// `MEDICINE:QUANTITY`; repeat for several medicines
        #[arg(long = "line", required = true, value_parser = commands::stock::parse_dispense_line)]
        lines: Vec<(MedicineId, i64)>,

        /// Note recorded on every entry
        #[arg(long)]
        note: Option<String>,
    },
    /// Inspect and correct ledger entries
    Tx {
        #[command(subcommand)]
        action: TxAction,
    },
    /// Print reports
    Report {
        #[command(subcommand)]
        report: ReportKind,
    },
}

#[derive(clap::Args)]
struct LotArgs {
    /// Medicine code
    #[arg(short, long)]
    medicine: MedicineId,

    /// Lot code
    #[arg(short, long)]
    lot: LotCode,

    /// Expiry date (YYYY-MM-DD)
    #[arg(long)]
    exp: NaiveDate,

    /// Manufacture date (YYYY-MM-DD)
    #[arg(long)]
    mfg: Option<NaiveDate>,

    /// Free-text note
    #[arg(long)]
    note: Option<String>,
}

#[derive(Subcommand)]
enum MedicineAction {
    /// Import medicines from a YAML file; existing codes are skipped
    Import {
        /// Path to the YAML file
        file: String,
    },
    /// List medicines
    List {
        /// Include deactivated medicines
        #[arg(long)]
        all: bool,
    },
    /// Add one medicine
    Add {
        /// Medicine code
        id: MedicineId,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Unit of measure
        #[arg(short, long)]
        unit: String,

        /// Category (`essential_drug`, `non_essential_drug`, `medical_supply`)
        #[arg(short, long, default_value = "essential_drug")]
        category: MedicineCategory,

        /// Reorder point
        #[arg(long, default_value_t = 0)]
        min_stock: i64,
    },
    /// Deactivate a medicine (admin)
    Deactivate { id: MedicineId },
    /// Reactivate a medicine (admin)
    Reactivate { id: MedicineId },
    /// Delete a medicine that has no stock history (admin)
    Delete { id: MedicineId },
}

#[derive(Subcommand)]
enum TxAction {
    /// Show a medicine's ledger with running balance
    History { medicine: MedicineId },
    /// Change an entry's quantity and/or note
    Edit {
        /// Entry ID
        id: i64,

        /// New unsigned quantity
        #[arg(short, long)]
        quantity: Option<i64>,

        /// New note (empty clears it)
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete an entry and reverse its effect on the lot
    Delete {
        /// Entry ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum ReportKind {
    /// Medicines at or below their reorder point
    LowStock,
    /// Lots expiring within the horizon
    NearExpiry {
        /// Horizon in days (default from `STOCK_NEAR_EXPIRY_DAYS`)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Dashboard summary
    Summary,
    /// Monthly report (default: previous month)
    Monthly {
        /// Month as YYYY-MM
        #[arg(long, value_parser = ReportMonth::parse)]
        month: Option<ReportMonth>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Lots whose quantity disagrees with their ledger
    Audit,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if matches!(cli.command, Commands::Migrate) {
        commands::migrate::run().await?;
        return Ok(());
    }

    let ctx = RequestContext::new(cli.actor, cli.role);
    let service = commands::connect().await?;

    match cli.command {
        Commands::Migrate => {}
        Commands::Medicine { action } => match action {
            MedicineAction::Import { file } => {
                commands::medicine::import_file(&service, &file, &ctx).await?;
            }
            MedicineAction::List { all } => commands::medicine::list(&service, all).await?,
            MedicineAction::Add {
                id,
                name,
                unit,
                category,
                min_stock,
            } => {
                commands::medicine::add(
                    &service,
                    commands::medicine::NewMedicine {
                        id,
                        name,
                        unit,
                        category,
                        min_stock,
                    },
                    &ctx,
                )
                .await?;
            }
            MedicineAction::Deactivate { id } => {
                commands::medicine::set_active(&service, &id, false, &ctx).await?;
            }
            MedicineAction::Reactivate { id } => {
                commands::medicine::set_active(&service, &id, true, &ctx).await?;
            }
            MedicineAction::Delete { id } => {
                commands::medicine::delete(&service, &id, &ctx).await?;
            }
        },
        Commands::Receive { lot, quantity } => {
            commands::stock::receive(&service, lot.into_input(quantity), &ctx).await?;
        }
        Commands::OpeningBalance { lot, quantity } => {
            commands::stock::opening_balance(&service, lot.into_input(quantity), &ctx).await?;
        }
        Commands::Dispense { lines, note } => {
            commands::stock::dispense(&service, lines, note, &ctx).await?;
        }
        Commands::Tx { action } => match action {
            TxAction::History { medicine } => {
                commands::ledger::history(&service, &medicine).await?;
            }
            TxAction::Edit { id, quantity, note } => {
                commands::ledger::edit(&service, id, quantity, note, &ctx).await?;
            }
            TxAction::Delete { id } => commands::ledger::delete(&service, id, &ctx).await?,
        },
        Commands::Report { report } => match report {
            ReportKind::LowStock => commands::report::low_stock(&service).await?,
            ReportKind::NearExpiry { days } => {
                commands::report::near_expiry(&service, days).await?;
            }
            ReportKind::Summary => commands::report::summary(&service).await?,
            ReportKind::Monthly { month, json } => {
                commands::report::monthly(&service, month, json).await?;
            }
            ReportKind::Audit => commands::report::audit(&service).await?,
        },
    }
    Ok(())
}

impl LotArgs {
    fn into_input(self, quantity: i64) -> commands::stock::LotEntry {
        commands::stock::LotEntry {
            medicine_id: self.medicine,
            lot_code: self.lot,
            quantity,
            mfg_date: self.mfg,
            exp_date: self.exp,
            note: self.note,
        }
    }
}
