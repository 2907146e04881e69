mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::installments::{CreditScoreArgs, MarkPaidArgs, ProgressArgs};
use commands::loan::{EmiArgs, LoanTermsArgs};
use commands::records::RecordCommand;
use vehicle_finance_core::records::StoreConfig;

/// Vehicle loan EMI calculations and loan record administration
#[derive(Parser)]
#[command(
    name = "vfin",
    version,
    about = "Vehicle loan EMI calculations and loan record administration",
    long_about = "Compute equal monthly installments, amortization tables and \
                  repayment progress for vehicle loans, and administer loan \
                  records kept in a local JSON store."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Loan record store file
    #[arg(long, env = "VFIN_STORE", default_value = "vfin-records.json", global = true)]
    store: PathBuf,

    /// Allow at most one loan record per owner email
    #[arg(long, env = "VFIN_UNIQUE_EMAIL", global = true)]
    unique_email: bool,

    /// Log store activity to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly installment (EMI) for principal, annual rate % and term
    Emi(EmiArgs),
    /// Simplified total interest and total payable
    Interest(LoanTermsArgs),
    /// EMI plus interest figures, with warnings for incomplete input
    Quote(LoanTermsArgs),
    /// Month-by-month amortization table
    Schedule(LoanTermsArgs),
    /// Paid / total / percent for a list of installment flags
    Progress(ProgressArgs),
    /// Mark one installment paid in a list of installment flags
    MarkPaid(MarkPaidArgs),
    /// Synthetic 600-900 score across several loans' installment flags
    CreditScore(CreditScoreArgs),
    /// Administer loan records in the store
    #[command(subcommand)]
    Record(RecordCommand),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store_config = StoreConfig {
        path: Some(cli.store.clone()),
        unique_owner_email: cli.unique_email,
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Emi(args) => commands::loan::run_emi(args),
        Commands::Interest(args) => commands::loan::run_interest(args),
        Commands::Quote(args) => commands::loan::run_quote(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Progress(args) => commands::installments::run_progress(args),
        Commands::MarkPaid(args) => commands::installments::run_mark_paid(args),
        Commands::CreditScore(args) => commands::installments::run_credit_score(args),
        Commands::Record(cmd) => commands::records::run_record(cmd, &store_config),
        Commands::Version => {
            println!("vfin {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
