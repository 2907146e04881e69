use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::emi::{self, LoanTermsInput};
use crate::error::VehicleFinanceError;
use crate::time_value;
use crate::types::*;
use crate::VehicleFinanceResult;

/// Longest term a month-by-month table is built for (100 years).
pub const MAX_SCHEDULE_MONTHS: i64 = 1200;

/// A single month in the amortization table. Amounts are rounded to cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: u32,
    pub opening_balance: Money,
    pub installment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub monthly_installment: Money,
    pub rows: Vec<AmortizationRow>,
    pub total_paid: Money,
    pub total_principal: Money,
    /// Interest actually implied by the EMI over the whole term.
    pub total_interest_amortized: Money,
    /// The simplified single-period figure from `emi::compute_interest_summary`.
    pub total_interest_simple: Money,
}

fn validate(input: &LoanTermsInput) -> VehicleFinanceResult<u32> {
    if input.principal <= Decimal::ZERO {
        return Err(VehicleFinanceError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if input.annual_interest_rate_percent < Decimal::ZERO {
        return Err(VehicleFinanceError::InvalidInput {
            field: "annual_interest_rate_percent".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    if input.term_months <= 0 || input.term_months > MAX_SCHEDULE_MONTHS {
        return Err(VehicleFinanceError::InvalidInput {
            field: "term_months".into(),
            reason: format!("Term must be between 1 and {MAX_SCHEDULE_MONTHS} months"),
        });
    }
    Ok(input.term_months as u32)
}

fn out_of_range(what: &str) -> VehicleFinanceError {
    VehicleFinanceError::InvalidInput {
        field: "principal".into(),
        reason: format!("{what} exceeds decimal range"),
    }
}

/// Unrounded installment; straight-line when the rate is zero.
fn level_installment(input: &LoanTermsInput, term: u32) -> VehicleFinanceResult<Money> {
    if input.annual_interest_rate_percent.is_zero() {
        return Ok(input.principal / Decimal::from(term));
    }
    let installment = emi::compute_monthly_installment(
        input.principal,
        input.annual_interest_rate_percent,
        input.term_months,
    );
    // saturated
    if installment == Decimal::MAX {
        return Err(out_of_range("Monthly installment"));
    }
    Ok(installment)
}

/// Build the month-by-month reducing-balance table for a loan.
///
/// Balances are carried at full precision; the last month repays whatever
/// remains so the table always closes at exactly zero.
pub fn build_amortization_schedule(
    input: &LoanTermsInput,
) -> VehicleFinanceResult<ComputationOutput<AmortizationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let term = validate(input)?;
    if input.annual_interest_rate_percent.is_zero() {
        warnings.push(
            "Zero interest rate: table is straight-line, but the stored monthly installment is 0"
                .into(),
        );
    }

    let r = emi::monthly_rate(input.annual_interest_rate_percent);
    let installment = level_installment(input, term)?;

    let mut rows = Vec::with_capacity(term as usize);
    let mut balance = input.principal;
    let mut total_paid = Decimal::ZERO;
    let mut total_principal = Decimal::ZERO;
    let mut total_interest = Decimal::ZERO;

    for month in 1..=term {
        let opening = balance;
        let interest = opening
            .checked_mul(r)
            .ok_or_else(|| out_of_range("Monthly interest"))?;
        let principal_part = if month == term {
            opening
        } else {
            installment
                .checked_sub(interest)
                .ok_or_else(|| out_of_range("Principal repaid"))?
        };
        let paid = interest
            .checked_add(principal_part)
            .ok_or_else(|| out_of_range("Installment"))?;

        balance = opening
            .checked_sub(principal_part)
            .ok_or_else(|| out_of_range("Balance"))?;
        total_paid = total_paid
            .checked_add(paid)
            .ok_or_else(|| out_of_range("Total paid"))?;
        total_principal = total_principal
            .checked_add(principal_part)
            .ok_or_else(|| out_of_range("Total principal"))?;
        total_interest = total_interest
            .checked_add(interest)
            .ok_or_else(|| out_of_range("Total interest"))?;

        rows.push(AmortizationRow {
            month,
            opening_balance: emi::round_money(opening),
            installment: emi::round_money(paid),
            interest: emi::round_money(interest),
            principal: emi::round_money(principal_part),
            closing_balance: emi::round_money(balance),
        });
    }

    let simple = emi::compute_interest_summary(input.principal, input.annual_interest_rate_percent);
    if emi::round_money(total_interest) != emi::round_money(simple.total_interest) {
        warnings.push(format!(
            "Amortized interest ({}) differs from the simplified total interest ({})",
            emi::round_money(total_interest),
            emi::round_money(simple.total_interest),
        ));
    }

    let output = AmortizationSchedule {
        monthly_installment: emi::round_money(installment),
        rows,
        total_paid: emi::round_money(total_paid),
        total_principal: emi::round_money(total_principal),
        total_interest_amortized: emi::round_money(total_interest),
        total_interest_simple: simple.total_interest,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Reducing-balance amortization table",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "annual_rate_percent": input.annual_interest_rate_percent.to_string(),
            "term_months": term,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Principal still owed after `installments_paid` level installments.
pub fn remaining_balance(input: &LoanTermsInput, installments_paid: u32) -> VehicleFinanceResult<Money> {
    let term = validate(input)?;
    if installments_paid >= term {
        return Ok(Decimal::ZERO);
    }

    let r = emi::monthly_rate(input.annual_interest_rate_percent);
    let installment = level_installment(input, term)?;
    let remaining = -time_value::fv(r, installments_paid, -installment, input.principal)?;
    Ok(emi::round_money(remaining.max(Decimal::ZERO)))
}
