pub mod installments;
pub mod loan;
pub mod records;
