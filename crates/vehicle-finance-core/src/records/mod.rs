//! Loan records and the store that owns them.

pub mod loan;
pub mod store;

pub use loan::{LoanRecord, LoanRecordInput, LoanRecordUpdate};
pub use store::{credit_profile_for_owner, InMemoryRecordStore, RecordEvent, RecordStore, StoreConfig};
