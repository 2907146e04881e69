use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::VehicleFinanceError;
use crate::types::{Money, Rate};
use crate::VehicleFinanceResult;

fn out_of_range(what: &str) -> VehicleFinanceError {
    VehicleFinanceError::InvalidInput {
        field: "nper".into(),
        reason: format!("{what} overflows decimal range"),
    }
}

/// Compound growth factor (1 + rate)^nper.
pub fn growth_factor(rate: Rate, nper: u32) -> VehicleFinanceResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powu(nper as u64)
        .ok_or_else(|| out_of_range(&format!("(1 + {rate})^{nper}")))
}

/// Future Value
///
/// Spreadsheet sign convention: money paid out is negative. The balance left
/// on a loan of `pv` after `nper` payments of `pmt` is `-fv(rate, nper, -pmt, pv)`.
pub fn fv(rate: Rate, nper: u32, pmt: Money, present_value: Money) -> VehicleFinanceResult<Money> {
    if rate.is_zero() {
        return pmt
            .checked_mul(Decimal::from(nper))
            .and_then(|paid| present_value.checked_add(paid))
            .map(|total| -total)
            .ok_or_else(|| out_of_range("future value"));
    }

    let factor = growth_factor(rate, nper)?;

    let grown = present_value.checked_mul(factor);
    let annuity = (factor - Decimal::ONE)
        .checked_div(rate)
        .and_then(|annuity_factor| pmt.checked_mul(annuity_factor));
    grown
        .zip(annuity)
        .and_then(|(grown, annuity)| grown.checked_add(annuity))
        .map(|total| -total)
        .ok_or_else(|| out_of_range("future value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fv_lump_sum() {
        // 1,000 compounded 12 months at 1% ≈ 1,126.83 owed
        let result = fv(dec!(0.01), 12, dec!(0), dec!(1000)).unwrap();
        assert!((result - dec!(-1126.83)).abs() < dec!(0.01));
    }

    #[test]
    fn test_fv_zero_rate_is_straight_line() {
        assert_eq!(fv(dec!(0), 10, dec!(-100), dec!(1000)).unwrap(), dec!(0));
        assert_eq!(fv(dec!(0), 4, dec!(-100), dec!(1000)).unwrap(), dec!(-600));
    }

    #[test]
    fn test_fv_overflow_is_error() {
        assert!(fv(dec!(1), 90, dec!(0), dec!(1e27)).is_err());
        assert!(fv(dec!(0), 1000, dec!(1e27), dec!(0)).is_err());
    }

    #[test]
    fn test_growth_factor() {
        assert_eq!(growth_factor(dec!(0.1), 2).unwrap(), dec!(1.21));
        assert_eq!(growth_factor(dec!(0.5), 0).unwrap(), Decimal::ONE);
        assert!(growth_factor(dec!(1), 200).is_err());
    }
}
