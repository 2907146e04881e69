use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use vehicle_finance_core::amortization::credit_score as scoring;
use vehicle_finance_core::amortization::{emi, installments, schedule};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct InterestInput {
    principal: rust_decimal::Decimal,
    annual_interest_rate_percent: rust_decimal::Decimal,
}

#[derive(Deserialize)]
struct FlagsInput {
    installments: Vec<bool>,
}

#[derive(Deserialize)]
struct MarkPaidInput {
    installments: Vec<bool>,
    index: u32,
}

#[derive(Deserialize)]
struct CreditScoreInput {
    loans: Vec<Vec<bool>>,
}

// ---------------------------------------------------------------------------
// EMI
// ---------------------------------------------------------------------------

/// Rounded EMI as a decimal string; "0" for incomplete loan terms.
#[napi]
pub fn monthly_installment(input_json: String) -> NapiResult<String> {
    let input: emi::LoanTermsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let amount = emi::monthly_installment_rounded(
        input.principal,
        input.annual_interest_rate_percent,
        input.term_months,
    );
    Ok(amount.to_string())
}

#[napi]
pub fn loan_quote(input_json: String) -> NapiResult<String> {
    let input: emi::LoanTermsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    serde_json::to_string(&emi::quote_loan(&input)).map_err(to_napi_error)
}

#[napi]
pub fn interest_summary(input_json: String) -> NapiResult<String> {
    let input: InterestInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = emi::compute_interest_summary(input.principal, input.annual_interest_rate_percent);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: emi::LoanTermsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::build_amortization_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Installments
// ---------------------------------------------------------------------------

#[napi]
pub fn installment_progress(input_json: String) -> NapiResult<String> {
    let input: FlagsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = installments::compute_progress(&input.installments);
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Returns the updated flag array; the index is zero-based.
#[napi]
pub fn mark_installment_paid(input_json: String) -> NapiResult<String> {
    let input: MarkPaidInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = installments::mark_installment_paid(&input.installments, input.index as usize)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn credit_score(input_json: String) -> NapiResult<String> {
    let input: CreditScoreInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scoring::compute_credit_profile(&input.loans);
    serde_json::to_string(&output).map_err(to_napi_error)
}
