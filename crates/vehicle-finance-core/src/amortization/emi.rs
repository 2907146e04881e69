//! Equal monthly installment (EMI) arithmetic.
//!
//! The EMI is computed at full `Decimal` precision. Rounding to cents happens
//! only at the storage/display boundary via [`round_money`], so a stored value
//! can always be recomputed from the three loan parameters without drift.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::time_value;
use crate::types::*;

/// Monthly periods in one year.
pub const MONTHS_PER_YEAR: u32 = 12;

/// Loan parameters as entered on a loan form.
///
/// `term_months` is signed so partially filled forms (e.g. `-1` or `0`) are
/// representable; such input yields a zero installment rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTermsInput {
    pub principal: Money,
    pub annual_interest_rate_percent: Percent,
    pub term_months: i64,
}

/// Simplified interest figures shown next to a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestSummary {
    /// Single-period simple interest: principal × rate / 100.
    pub total_interest: Money,
    pub total_payable: Money,
}

/// Output of [`quote_loan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanQuote {
    /// EMI rounded half-up to cents, the value that gets stored.
    pub monthly_installment: Money,
    pub monthly_installment_unrounded: Money,
    pub monthly_rate: Rate,
    /// Rounded EMI × term.
    pub total_of_installments: Money,
    pub interest: InterestSummary,
}

/// Convert an annual percentage (7.5 = 7.5%) to a monthly decimal fraction.
pub fn monthly_rate(annual_rate_percent: Percent) -> Rate {
    annual_rate_percent / (Decimal::from(MONTHS_PER_YEAR) * dec!(100))
}

/// Round half-up (midpoint away from zero) to two decimal places.
pub fn round_money(amount: Money) -> Money {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn is_degenerate(principal: Money, annual_rate_percent: Percent, term_months: i64) -> bool {
    principal <= Decimal::ZERO || annual_rate_percent <= Decimal::ZERO || term_months <= 0
}

/// Fixed monthly installment for an amortizing loan, unrounded.
///
/// `emi = P·r·(1+r)^n / ((1+r)^n − 1)` with `r = rate / 1200`.
/// Returns exactly zero when any of the three inputs is non-positive, and
/// saturates at `Decimal::MAX` when the installment is beyond decimal range.
pub fn compute_monthly_installment(
    principal: Money,
    annual_rate_percent: Percent,
    term_months: i64,
) -> Money {
    if is_degenerate(principal, annual_rate_percent, term_months) {
        return Decimal::ZERO;
    }

    let r = monthly_rate(annual_rate_percent);

    // emi >= P·r, so an overflow here means the installment itself overflows
    let Some(interest_only) = principal.checked_mul(r) else {
        return Decimal::MAX;
    };

    // (1+r)^n beyond decimal range: the formula's limit is P·r.
    let factor = match u32::try_from(term_months)
        .ok()
        .and_then(|n| time_value::growth_factor(r, n).ok())
    {
        Some(f) => f,
        None => return interest_only,
    };

    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        // r below decimal resolution: straight-line limit
        return principal / Decimal::from(term_months);
    }

    interest_only
        .checked_mul(factor)
        .and_then(|numerator| numerator.checked_div(denominator))
        // P·r·(1+r)^n overflows for very large principals; divide through by (1+r)^n
        .or_else(|| interest_only.checked_div(Decimal::ONE - Decimal::ONE / factor))
        .unwrap_or(Decimal::MAX)
}

/// [`compute_monthly_installment`] rounded for storage or display.
pub fn monthly_installment_rounded(
    principal: Money,
    annual_rate_percent: Percent,
    term_months: i64,
) -> Money {
    round_money(compute_monthly_installment(
        principal,
        annual_rate_percent,
        term_months,
    ))
}

/// Simple (non-compounded) interest over the life of the loan.
///
/// Deliberately not the amortized interest implied by the EMI; see
/// `schedule::build_amortization_schedule` for that figure. Saturates at the
/// decimal range instead of overflowing.
pub fn compute_interest_summary(principal: Money, annual_rate_percent: Percent) -> InterestSummary {
    let total_interest = principal.saturating_mul(annual_rate_percent / dec!(100));
    InterestSummary {
        total_interest,
        total_payable: principal.saturating_add(total_interest),
    }
}

/// Bundle the EMI and interest figures for a set of loan terms.
pub fn quote_loan(input: &LoanTermsInput) -> ComputationOutput<LoanQuote> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.principal <= Decimal::ZERO {
        warnings.push("Principal is not positive; monthly installment set to 0".into());
    }
    if input.annual_interest_rate_percent <= Decimal::ZERO {
        warnings.push("Interest rate is not positive; monthly installment set to 0".into());
    }
    if input.term_months <= 0 {
        warnings.push("Term is not positive; monthly installment set to 0".into());
    }

    let unrounded = compute_monthly_installment(
        input.principal,
        input.annual_interest_rate_percent,
        input.term_months,
    );
    let rounded = round_money(unrounded);
    let term = Decimal::from(input.term_months.max(0));

    let output = LoanQuote {
        monthly_installment: rounded,
        monthly_installment_unrounded: unrounded,
        monthly_rate: monthly_rate(input.annual_interest_rate_percent),
        total_of_installments: rounded.saturating_mul(term),
        interest: compute_interest_summary(input.principal, input.annual_interest_rate_percent),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Equal Monthly Installment (reducing balance)",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "annual_rate_percent": input.annual_interest_rate_percent.to_string(),
            "term_months": input.term_months,
            "rounding": "half-up, 2dp, at storage",
            "interest_model": "simple, single period",
        }),
        warnings,
        elapsed,
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_emi() {
        // 50,000 at 4.5% over 60 months => 932.1509...
        let emi = compute_monthly_installment(dec!(50000), dec!(4.5), 60);
        assert!((emi - dec!(932.151)).abs() < dec!(0.001));
        assert_eq!(round_money(emi), dec!(932.15));
    }

    #[test]
    fn test_degenerate_inputs_are_zero() {
        assert_eq!(compute_monthly_installment(dec!(0), dec!(5), 12), Decimal::ZERO);
        assert_eq!(compute_monthly_installment(dec!(-10), dec!(5), 12), Decimal::ZERO);
        assert_eq!(compute_monthly_installment(dec!(1000), dec!(0), 12), Decimal::ZERO);
        assert_eq!(compute_monthly_installment(dec!(1000), dec!(-1), 12), Decimal::ZERO);
        assert_eq!(compute_monthly_installment(dec!(1000), dec!(5), 0), Decimal::ZERO);
        assert_eq!(compute_monthly_installment(dec!(1000), dec!(5), -3), Decimal::ZERO);
    }

    #[test]
    fn test_single_month_loan() {
        // One installment repays principal plus one month of interest
        let emi = compute_monthly_installment(dec!(1200), dec!(12), 1);
        assert_eq!(round_money(emi), dec!(1212.00));
    }

    #[test]
    fn test_tiny_rate_approaches_straight_line() {
        let emi = compute_monthly_installment(dec!(1200), dec!(0.0000000001), 12);
        assert!((emi - dec!(100)).abs() < dec!(0.01));
    }

    #[test]
    fn test_huge_term_does_not_panic() {
        let emi = compute_monthly_installment(dec!(1000), dec!(12), 1_000_000);
        // limit P·r = 1000 × 0.01
        assert_eq!(emi, dec!(10));
    }

    #[test]
    fn test_out_of_range_installment_saturates() {
        // P·r = 1e20 × 1e12 / 1200 is past Decimal::MAX
        let emi = compute_monthly_installment(dec!(1e20), dec!(1e12), 60);
        assert_eq!(emi, Decimal::MAX);
        assert_eq!(round_money(emi), Decimal::MAX);

        let quote = quote_loan(&LoanTermsInput {
            principal: dec!(1e20),
            annual_interest_rate_percent: dec!(1e12),
            term_months: 60,
        });
        assert_eq!(quote.result.total_of_installments, Decimal::MAX);
        assert_eq!(quote.result.interest.total_payable, Decimal::MAX);
    }

    #[test]
    fn test_large_principal_numerator_overflow_still_finite() {
        // r = 1: P·r fits but P·r·2^60 does not; emi = P / (1 − 2^-60)
        let emi = compute_monthly_installment(dec!(1e20), dec!(1200), 60);
        assert!(emi >= dec!(1e20) && emi < dec!(1.001e20));
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.015)), dec!(1.02));
        assert_eq!(round_money(dec!(1.004999)), dec!(1.00));
    }

    #[test]
    fn test_interest_summary() {
        let s = compute_interest_summary(dec!(50000), dec!(4.5));
        assert_eq!(s.total_interest, dec!(2250));
        assert_eq!(s.total_payable, dec!(52250));
    }

    #[test]
    fn test_quote_warns_on_partial_form() {
        let input = LoanTermsInput {
            principal: dec!(20000),
            annual_interest_rate_percent: dec!(0),
            term_months: 36,
        };
        let quote = quote_loan(&input);
        assert_eq!(quote.result.monthly_installment, Decimal::ZERO);
        assert_eq!(quote.warnings.len(), 1);
    }

    #[test]
    fn test_quote_totals() {
        let input = LoanTermsInput {
            principal: dec!(50000),
            annual_interest_rate_percent: dec!(4.5),
            term_months: 60,
        };
        let quote = quote_loan(&input).result;
        assert_eq!(quote.monthly_installment, dec!(932.15));
        assert_eq!(quote.total_of_installments, dec!(55929.00));
        assert_eq!(quote.monthly_rate, dec!(0.00375));
        assert!(quote.monthly_installment_unrounded > quote.monthly_installment);
    }
}
