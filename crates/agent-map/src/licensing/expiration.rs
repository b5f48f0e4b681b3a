//! Days-until-expiration math shared by the lookup view and notices.

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::LicensedState;

/// Licenses expiring within this many days (inclusive) are flagged.
pub const EXPIRING_SOON_WINDOW_DAYS: i64 = 31;

/// Reported when there is no license to expire, so callers can sort and
/// threshold without special-casing absence.
pub const NO_LICENSE_DAYS: i64 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirationStatus {
    pub license_number: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub is_expiring_soon: bool,
    /// Negative once the date has passed but the sweep has not run yet.
    pub days_until_expiration: i64,
}

pub fn evaluate(license: Option<&LicensedState>, today: NaiveDate) -> ExpirationStatus {
    match license {
        None => ExpirationStatus {
            license_number: None,
            expiration_date: None,
            is_expiring_soon: false,
            days_until_expiration: NO_LICENSE_DAYS,
        },
        Some(license) => {
            let days = (license.expiration - today).num_days();
            ExpirationStatus {
                license_number: Some(license.license_number.clone()),
                expiration_date: Some(license.expiration),
                is_expiring_soon: days <= EXPIRING_SOON_WINDOW_DAYS,
                days_until_expiration: days,
            }
        }
    }
}
