use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::credit_score::InstallmentHistory;
use crate::amortization::emi::{self, InterestSummary, LoanTermsInput};
use crate::amortization::installments::{self, InstallmentProgress, LoanStatus, LoanSummary};
use crate::error::VehicleFinanceError;
use crate::types::{Money, Percent};
use crate::VehicleFinanceResult;

/// Fields supplied when a loan record is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRecordInput {
    pub name: String,
    pub vehicle_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub principal: Money,
    pub annual_interest_rate_percent: Percent,
    pub term_months: u32,
}

/// Partial update. `None` leaves a field unchanged.
///
/// `term_months` may be supplied but must equal the current term; the number
/// of installments is fixed once a record exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanRecordUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vehicle_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub principal: Option<Money>,
    #[serde(default)]
    pub annual_interest_rate_percent: Option<Percent>,
    #[serde(default)]
    pub term_months: Option<u32>,
    /// Reject the update unless the record is still at this version.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: String,
    pub name: String,
    pub vehicle_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub principal: Money,
    pub annual_interest_rate_percent: Percent,
    pub term_months: u32,
    pub installments: Vec<bool>,
    /// EMI rounded to cents when the record was created or last edited.
    pub monthly_installment: Money,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanRecord {
    pub fn new(id: String, input: LoanRecordInput, now: DateTime<Utc>) -> VehicleFinanceResult<Self> {
        let name = normalize_non_empty(&input.name, "name")?;
        let vehicle_name = normalize_non_empty(&input.vehicle_name, "vehicle_name")?;
        let email = normalize_email(&input.email)?;
        validate_principal(input.principal)?;
        validate_rate(input.annual_interest_rate_percent)?;
        if input.term_months == 0 {
            return Err(VehicleFinanceError::InvalidInput {
                field: "term_months".into(),
                reason: "Term must be at least 1 month".into(),
            });
        }

        Ok(Self {
            id,
            name,
            vehicle_name,
            email,
            image_url: normalize_optional(input.image_url.as_deref()),
            principal: input.principal,
            annual_interest_rate_percent: input.annual_interest_rate_percent,
            term_months: input.term_months,
            installments: installments::installment_schedule(input.term_months),
            monthly_installment: emi::monthly_installment_rounded(
                input.principal,
                input.annual_interest_rate_percent,
                input.term_months as i64,
            ),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an administrative edit and recompute the cached EMI.
    ///
    /// Validation happens before any field changes, so a rejected update
    /// leaves the record untouched.
    pub fn apply_update(&mut self, update: LoanRecordUpdate, now: DateTime<Utc>) -> VehicleFinanceResult<()> {
        self.check_version(update.expected_version)?;

        if let Some(term) = update.term_months {
            if term != self.term_months {
                return Err(VehicleFinanceError::InvalidInput {
                    field: "term_months".into(),
                    reason: format!(
                        "Term is fixed at {} months once a record exists",
                        self.term_months
                    ),
                });
            }
        }

        let name = update
            .name
            .as_deref()
            .map(|v| normalize_non_empty(v, "name"))
            .transpose()?;
        let vehicle_name = update
            .vehicle_name
            .as_deref()
            .map(|v| normalize_non_empty(v, "vehicle_name"))
            .transpose()?;
        let email = update.email.as_deref().map(normalize_email).transpose()?;
        if let Some(principal) = update.principal {
            validate_principal(principal)?;
        }
        if let Some(rate) = update.annual_interest_rate_percent {
            validate_rate(rate)?;
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(vehicle_name) = vehicle_name {
            self.vehicle_name = vehicle_name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if update.image_url.is_some() {
            self.image_url = normalize_optional(update.image_url.as_deref());
        }
        if let Some(principal) = update.principal {
            self.principal = principal;
        }
        if let Some(rate) = update.annual_interest_rate_percent {
            self.annual_interest_rate_percent = rate;
        }

        self.monthly_installment = emi::monthly_installment_rounded(
            self.principal,
            self.annual_interest_rate_percent,
            self.term_months as i64,
        );
        self.touch(now);
        Ok(())
    }

    /// Mark one installment paid. Returns whether anything changed.
    pub fn mark_installment_paid(&mut self, index: usize, now: DateTime<Utc>) -> VehicleFinanceResult<bool> {
        let updated = installments::mark_installment_paid(&self.installments, index)?;
        if updated == self.installments {
            return Ok(false);
        }
        self.installments = updated;
        self.touch(now);
        Ok(true)
    }

    pub fn check_version(&self, expected: Option<u64>) -> VehicleFinanceResult<()> {
        match expected {
            Some(expected) if expected != self.version => Err(VehicleFinanceError::VersionConflict {
                id: self.id.clone(),
                expected,
                actual: self.version,
            }),
            _ => Ok(()),
        }
    }

    pub fn terms(&self) -> LoanTermsInput {
        LoanTermsInput {
            principal: self.principal,
            annual_interest_rate_percent: self.annual_interest_rate_percent,
            term_months: self.term_months as i64,
        }
    }

    pub fn progress(&self) -> InstallmentProgress {
        installments::compute_progress(&self.installments)
    }

    pub fn status(&self) -> LoanStatus {
        installments::loan_status(&self.installments)
    }

    pub fn interest_summary(&self) -> InterestSummary {
        emi::compute_interest_summary(self.principal, self.annual_interest_rate_percent)
    }

    pub fn summary(&self) -> LoanSummary {
        installments::summarize_loan(&self.installments, self.monthly_installment)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version = self.version.saturating_add(1);
        self.updated_at = now;
    }
}

impl InstallmentHistory for LoanRecord {
    fn installments(&self) -> &[bool] {
        &self.installments
    }
}

pub(crate) fn normalize_email(value: &str) -> VehicleFinanceResult<String> {
    let email = normalize_non_empty(value, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(VehicleFinanceError::InvalidInput {
            field: "email".into(),
            reason: format!("'{email}' is not an email address"),
        });
    }
    Ok(email)
}

fn normalize_non_empty(value: &str, field: &str) -> VehicleFinanceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(VehicleFinanceError::InvalidInput {
            field: field.into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(trimmed.to_string())
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_principal(principal: Money) -> VehicleFinanceResult<()> {
    if principal <= Decimal::ZERO {
        return Err(VehicleFinanceError::InvalidInput {
            field: "principal".into(),
            reason: "Amount financed must be positive".into(),
        });
    }
    Ok(())
}

fn validate_rate(rate: Percent) -> VehicleFinanceResult<()> {
    if rate < Decimal::ZERO {
        return Err(VehicleFinanceError::InvalidInput {
            field: "annual_interest_rate_percent".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    Ok(())
}
