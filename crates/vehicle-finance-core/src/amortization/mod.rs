//! Amortization engine: pure, synchronous loan arithmetic.
//!
//! Nothing here performs I/O or holds state; every function is a
//! deterministic computation over its arguments.

pub mod credit_score;
pub mod emi;
pub mod installments;
pub mod schedule;

pub use credit_score::{compute_credit_profile, compute_credit_score, AggregateCreditProfile, InstallmentHistory};
pub use emi::{compute_interest_summary, compute_monthly_installment, round_money, InterestSummary, LoanTermsInput};
pub use installments::{compute_progress, installment_schedule, mark_installment_paid, InstallmentProgress, LoanStatus};
