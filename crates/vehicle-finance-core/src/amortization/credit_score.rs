//! Synthetic repayment score across all of one owner's loans.
//!
//! The score is a presentation heuristic: 600 with no history, rising
//! linearly to 900 as the share of paid installments reaches 100%.
//! It is never persisted.

use serde::{Deserialize, Serialize};

/// Score with no installment history.
pub const BASELINE_SCORE: u32 = 600;
/// Score when every installment is paid.
pub const MAX_SCORE: u32 = 900;

const SCORE_SPAN: u32 = MAX_SCORE - BASELINE_SCORE;

/// Anything carrying an ordered installment-paid history.
pub trait InstallmentHistory {
    fn installments(&self) -> &[bool];
}

impl InstallmentHistory for [bool] {
    fn installments(&self) -> &[bool] {
        self
    }
}

impl InstallmentHistory for Vec<bool> {
    fn installments(&self) -> &[bool] {
        self
    }
}

impl<T: InstallmentHistory + ?Sized> InstallmentHistory for &T {
    fn installments(&self) -> &[bool] {
        (**self).installments()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCreditProfile {
    pub loan_count: usize,
    pub total_installments: usize,
    pub paid_installments: usize,
    pub score: u32,
}

pub fn compute_credit_profile<I>(records: I) -> AggregateCreditProfile
where
    I: IntoIterator,
    I::Item: InstallmentHistory,
{
    let mut loan_count = 0;
    let mut total_installments = 0;
    let mut paid_installments = 0;

    for record in records {
        let flags = record.installments();
        loan_count += 1;
        total_installments += flags.len();
        paid_installments += flags.iter().filter(|paid| **paid).count();
    }

    AggregateCreditProfile {
        loan_count,
        total_installments,
        paid_installments,
        score: score_from_counts(paid_installments, total_installments),
    }
}

/// Score in `[600, 900]` for a single owner's loans.
pub fn compute_credit_score<I>(records: I) -> u32
where
    I: IntoIterator,
    I::Item: InstallmentHistory,
{
    compute_credit_profile(records).score
}

/// floor(600 + 300 · paid / total), or 600 when `total` is zero.
fn score_from_counts(paid: usize, total: usize) -> u32 {
    if total == 0 {
        return BASELINE_SCORE;
    }
    let paid = paid.min(total) as u128;
    let bonus = paid * SCORE_SPAN as u128 / total as u128;
    BASELINE_SCORE + bonus as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_records_is_baseline() {
        let none: Vec<Vec<bool>> = Vec::new();
        assert_eq!(compute_credit_score(&none), 600);
    }

    #[test]
    fn test_records_without_installments_is_baseline() {
        let empty = vec![Vec::<bool>::new(), Vec::new()];
        assert_eq!(compute_credit_score(&empty), 600);
    }

    #[test]
    fn test_fully_paid_is_max() {
        let records = vec![vec![true; 12], vec![true; 3]];
        assert_eq!(compute_credit_score(&records), 900);
    }

    #[test]
    fn test_half_paid_across_records() {
        let records = vec![vec![true; 10], vec![false; 10]];
        assert_eq!(
            compute_credit_profile(&records),
            AggregateCreditProfile {
                loan_count: 2,
                total_installments: 20,
                paid_installments: 10,
                score: 750,
            }
        );
    }

    #[test]
    fn test_score_floors() {
        // 1/3 paid => 600 + 100 = 700; 2/3 => 800; 1/7 => 642.857 => 642
        assert_eq!(compute_credit_score(&[vec![true, false, false]]), 700);
        assert_eq!(compute_credit_score(&[vec![true, true, false]]), 800);
        let mut sevenths = vec![false; 7];
        sevenths[3] = true;
        assert_eq!(compute_credit_score(&[sevenths]), 642);
    }

    #[test]
    fn test_accepts_slices() {
        let a: &[bool] = &[true, false];
        assert_eq!(compute_credit_score([a]), 750);
    }
}
