use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use vehicle_finance_core::amortization::emi::{self, LoanTermsInput};
use vehicle_finance_core::amortization::schedule;

use crate::input;

/// Loan terms shared by the calculator commands
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct LoanTermsArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount financed
    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (7.5 = 7.5%)
    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Term in months
    #[arg(long, alias = "months")]
    pub term: Option<i64>,
}

impl LoanTermsArgs {
    fn into_terms(self) -> Result<LoanTermsInput, Box<dyn std::error::Error>> {
        let LoanTermsArgs {
            input: path,
            principal,
            annual_rate,
            term,
        } = self;

        input::resolve(path.as_deref(), || {
            Ok(LoanTermsInput {
                principal: principal.ok_or("--principal is required (or provide --input)")?,
                annual_interest_rate_percent: annual_rate
                    .ok_or("--annual-rate is required (or provide --input)")?,
                term_months: term.ok_or("--term is required (or provide --input)")?,
            })
        })
    }
}

/// Arguments for the EMI calculation
#[derive(Args)]
pub struct EmiArgs {
    #[command(flatten)]
    pub terms: LoanTermsArgs,

    /// Print the unrounded installment as well
    #[arg(long)]
    pub unrounded: bool,
}

pub fn run_emi(args: EmiArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = args.terms.into_terms()?;
    let raw = emi::compute_monthly_installment(
        terms.principal,
        terms.annual_interest_rate_percent,
        terms.term_months,
    );

    let mut out = json!({ "monthly_installment": emi::round_money(raw) });
    if args.unrounded {
        out["monthly_installment_unrounded"] = serde_json::to_value(raw)?;
    }
    Ok(out)
}

pub fn run_interest(args: LoanTermsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = args.into_terms()?;
    let summary = emi::compute_interest_summary(terms.principal, terms.annual_interest_rate_percent);
    Ok(serde_json::to_value(summary)?)
}

pub fn run_quote(args: LoanTermsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = args.into_terms()?;
    Ok(serde_json::to_value(emi::quote_loan(&terms))?)
}

pub fn run_schedule(args: LoanTermsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = args.into_terms()?;
    let result = schedule::build_amortization_schedule(&terms)?;
    Ok(serde_json::to_value(result)?)
}
