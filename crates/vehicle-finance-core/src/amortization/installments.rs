//! Installment flags and payment progress.
//!
//! A loan's payment history is an ordered `[bool]`: index 0 is the first
//! installment due, `true` means paid. Flags only ever move `false → true`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::VehicleFinanceError;
use crate::types::Money;
use crate::VehicleFinanceResult;

/// State of a single installment. `Paid` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    Unpaid,
    Paid,
}

/// Derived classification of a whole loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// At least one installment is unpaid
    Active,
    /// Every installment is paid
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentProgress {
    pub paid_count: usize,
    pub total_count: usize,
    /// Whole percent, rounded half-up.
    pub percent: u32,
}

/// Progress plus money figures for one loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSummary {
    pub progress: InstallmentProgress,
    pub status: LoanStatus,
    /// 1-based number of the earliest unpaid installment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_installment: Option<usize>,
    pub amount_paid: Money,
    pub amount_remaining: Money,
}

/// A fresh schedule: `term_months` unpaid installments.
pub fn installment_schedule(term_months: u32) -> Vec<bool> {
    vec![false; term_months as usize]
}

/// Return a copy of `installments` with `index` marked paid.
///
/// Re-marking a paid installment returns an unchanged copy. The caller's
/// slice is never modified.
pub fn mark_installment_paid(installments: &[bool], index: usize) -> VehicleFinanceResult<Vec<bool>> {
    check_index(installments, index)?;

    let mut updated = installments.to_vec();
    updated[index] = true;
    Ok(updated)
}

pub fn installment_status(installments: &[bool], index: usize) -> VehicleFinanceResult<InstallmentStatus> {
    check_index(installments, index)?;
    Ok(if installments[index] {
        InstallmentStatus::Paid
    } else {
        InstallmentStatus::Unpaid
    })
}

pub fn compute_progress(installments: &[bool]) -> InstallmentProgress {
    let total_count = installments.len();
    let paid_count = installments.iter().filter(|paid| **paid).count();

    let percent = if total_count == 0 {
        0
    } else {
        // round(100·paid/total) half-up, in integers: floor((200·paid + total) / (2·total))
        ((200 * paid_count + total_count) / (2 * total_count)) as u32
    };

    InstallmentProgress {
        paid_count,
        total_count,
        percent,
    }
}

/// `Completed` once every installment is paid. A schedule with no
/// installments has nothing paid off and stays `Active`.
pub fn loan_status(installments: &[bool]) -> LoanStatus {
    if !installments.is_empty() && installments.iter().all(|paid| *paid) {
        LoanStatus::Completed
    } else {
        LoanStatus::Active
    }
}

/// Index of the earliest unpaid installment, if any.
pub fn next_due_index(installments: &[bool]) -> Option<usize> {
    installments.iter().position(|paid| !*paid)
}

pub fn summarize_loan(installments: &[bool], monthly_installment: Money) -> LoanSummary {
    let progress = compute_progress(installments);
    let unpaid = progress.total_count - progress.paid_count;

    LoanSummary {
        progress,
        status: loan_status(installments),
        next_due_installment: next_due_index(installments).map(|i| i + 1),
        amount_paid: monthly_installment.saturating_mul(Decimal::from(progress.paid_count as u64)),
        amount_remaining: monthly_installment.saturating_mul(Decimal::from(unpaid as u64)),
    }
}

fn check_index(installments: &[bool], index: usize) -> VehicleFinanceResult<()> {
    if index >= installments.len() {
        return Err(VehicleFinanceError::IndexOutOfRange {
            index,
            len: installments.len(),
        });
    }
    Ok(())
}
