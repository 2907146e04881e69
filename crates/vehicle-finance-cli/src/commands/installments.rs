use clap::Args;
use serde::Deserialize;
use serde_json::{json, Value};

use vehicle_finance_core::amortization::{credit_score, installments};

use crate::input;

/// One loan's installment flags as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentFlags(pub Vec<bool>);

/// Parse installment flags: `true,false,1,0,x,.` separated by commas, or a
/// compact strip such as `xx..`.
pub fn parse_flags(raw: &str) -> Result<InstallmentFlags, String> {
    parse_flag_list(raw).map(InstallmentFlags)
}

fn parse_flag_list(raw: &str) -> Result<Vec<bool>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let tokens: Vec<&str> = if raw.contains(',') {
        raw.split(',').map(str::trim).collect()
    } else if raw.chars().all(|c| matches!(c, 'x' | 'X' | '.')) {
        return Ok(raw.chars().map(|c| c != '.').collect());
    } else {
        vec![raw]
    };

    tokens
        .into_iter()
        .map(|t| match t.to_ascii_lowercase().as_str() {
            "true" | "1" | "x" | "paid" | "y" => Ok(true),
            "false" | "0" | "." | "unpaid" | "n" => Ok(false),
            other => Err(format!("'{other}' is not an installment flag")),
        })
        .collect()
}

#[derive(Deserialize)]
struct FlagsInput {
    installments: Vec<bool>,
}

#[derive(Deserialize)]
struct MarkPaidInput {
    installments: Vec<bool>,
    /// Zero-based index.
    index: usize,
}

#[derive(Deserialize)]
struct CreditScoreInput {
    loans: Vec<Vec<bool>>,
}

/// Arguments for installment progress
#[derive(Args)]
pub struct ProgressArgs {
    /// Path to JSON/YAML input file with an `installments` array
    #[arg(long)]
    pub input: Option<String>,

    /// Installment flags, e.g. "true,true,false" or "xx."
    #[arg(long, value_parser = parse_flags)]
    pub installments: Option<InstallmentFlags>,
}

pub fn run_progress(args: ProgressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let flags: FlagsInput = input::resolve(args.input.as_deref(), || {
        Ok(FlagsInput {
            installments: args
                .installments
                .ok_or("--installments is required (or provide --input)")?
                .0,
        })
    })?;

    let progress = installments::compute_progress(&flags.installments);
    let mut out = serde_json::to_value(progress)?;
    out["status"] = serde_json::to_value(installments::loan_status(&flags.installments))?;
    Ok(out)
}

/// Arguments for marking an installment paid
#[derive(Args)]
pub struct MarkPaidArgs {
    /// Path to JSON/YAML input file with `installments` and zero-based `index`
    #[arg(long)]
    pub input: Option<String>,

    /// Installment flags, e.g. "true,false,false" or "x.."
    #[arg(long, value_parser = parse_flags)]
    pub installments: Option<InstallmentFlags>,

    /// Installment number to mark paid, counting from 1
    #[arg(long)]
    pub number: Option<usize>,
}

pub fn run_mark_paid(args: MarkPaidArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let req: MarkPaidInput = input::resolve(args.input.as_deref(), || {
        let number = args
            .number
            .ok_or("--number is required (or provide --input)")?;
        Ok(MarkPaidInput {
            installments: args
                .installments
                .ok_or("--installments is required (or provide --input)")?
                .0,
            index: number
                .checked_sub(1)
                .ok_or("--number counts from 1")?,
        })
    })?;

    let updated = installments::mark_installment_paid(&req.installments, req.index)?;
    let progress = installments::compute_progress(&updated);
    Ok(json!({
        "installments": updated,
        "progress": progress,
    }))
}

/// Arguments for the synthetic credit score
#[derive(Args)]
pub struct CreditScoreArgs {
    /// Path to JSON/YAML input file with a `loans` array of flag arrays
    #[arg(long)]
    pub input: Option<String>,

    /// One loan's installment flags; repeat for each loan
    #[arg(long = "loan", value_parser = parse_flags)]
    pub loans: Vec<InstallmentFlags>,
}

pub fn run_credit_score(args: CreditScoreArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let req: CreditScoreInput = input::resolve(args.input.as_deref(), || {
        if args.loans.is_empty() {
            return Err("--loan is required at least once (or provide --input)".into());
        }
        Ok(CreditScoreInput {
            loans: args.loans.into_iter().map(|f| f.0).collect(),
        })
    })?;

    let profile = credit_score::compute_credit_profile(&req.loans);
    Ok(serde_json::to_value(profile)?)
}
