use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::states::StateCode;

pub const DEFAULT_LICENSE_NUMBER: &str = "N/A";
pub const DEFAULT_LICENSE_COLOR: &str = "#0692e1";
pub const DEFAULT_FULL_NAME: &str = "N";
pub const DEFAULT_FORM_DATE: &str = "None";

/// Expiration recorded when ingestion did not capture one.
pub fn no_expiration() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Opaque identity reference shared with the external user directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub id: AgentId,
    pub username: String,
}

/// Row id of a license; later inserts get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LicenseId(pub i64);

/// One license an agent holds (or held) in one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicensedState {
    pub id: LicenseId,
    pub agent_id: AgentId,
    pub state: StateCode,
    pub license_number: String,
    pub expiration: NaiveDate,
    /// Map fill color, `#RRGGBB`.
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(pub i64);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored carrier document tagged by company, state, and form type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Form {
    pub id: FormId,
    pub company: String,
    pub full_company: String,
    pub state: StateCode,
    pub form_type: String,
    pub full_form_type: String,
    /// Plan-year tag, `"None"` when the filename carried no date.
    pub date: String,
    /// Path relative to the document root, as written by ingestion.
    pub file_path: String,
}

/// License row before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLicense {
    pub agent_id: AgentId,
    pub state: StateCode,
    pub license_number: String,
    pub expiration: NaiveDate,
    pub color: String,
}

impl NewLicense {
    pub fn new(agent_id: AgentId, state: StateCode, expiration: NaiveDate) -> Self {
        Self {
            agent_id,
            state,
            license_number: DEFAULT_LICENSE_NUMBER.to_string(),
            expiration,
            color: DEFAULT_LICENSE_COLOR.to_string(),
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.license_number = number.into();
        self
    }
}

/// Form row before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForm {
    pub company: String,
    pub full_company: String,
    pub state: StateCode,
    pub form_type: String,
    pub full_form_type: String,
    pub date: String,
    pub file_path: String,
}

impl NewForm {
    pub fn new(
        company: impl Into<String>,
        full_company: impl Into<String>,
        state: StateCode,
        form_type: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            full_company: full_company.into(),
            state,
            form_type: form_type.into(),
            full_form_type: DEFAULT_FULL_NAME.to_string(),
            date: DEFAULT_FORM_DATE.to_string(),
            file_path: file_path.into(),
        }
    }
}

pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
