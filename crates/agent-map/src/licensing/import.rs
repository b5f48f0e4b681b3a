//! Loads rows already extracted by the ingestion tooling into the store.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{
    is_hex_color, no_expiration, Agent, AgentId, NewForm, NewLicense, DEFAULT_FORM_DATE,
    DEFAULT_FULL_NAME, DEFAULT_LICENSE_COLOR, DEFAULT_LICENSE_NUMBER,
};
use super::repository::StoreError;
use super::sqlite::SqliteStore;
use super::states::StateCode;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

impl ImportSummary {
    fn tally<T>(stored: &[Option<T>]) -> Self {
        let inserted = stored.iter().filter(|slot| slot.is_some()).count();
        Self {
            inserted,
            skipped: stored.len() - inserted,
        }
    }
}

pub fn import_forms_from_path<P: AsRef<Path>>(
    store: &SqliteStore,
    path: P,
) -> Result<ImportSummary, ImportError> {
    import_forms(store, File::open(path)?)
}

/// Rows identical to an existing form are counted as skipped. The batch is
/// written in one transaction.
pub fn import_forms<R: Read>(store: &SqliteStore, reader: R) -> Result<ImportSummary, ImportError> {
    let forms = parse_forms(reader)?;
    let summary = ImportSummary::tally(&store.insert_form_batch(&forms)?);
    tracing::info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "imported form rows"
    );
    Ok(summary)
}

pub fn import_licenses_from_path<P: AsRef<Path>>(
    store: &SqliteStore,
    path: P,
) -> Result<ImportSummary, ImportError> {
    import_licenses(store, File::open(path)?)
}

/// Agents referenced by a row are created (or renamed) first. A license the
/// agent already holds in that state under the same number is skipped.
pub fn import_licenses<R: Read>(
    store: &SqliteStore,
    reader: R,
) -> Result<ImportSummary, ImportError> {
    let rows = parse_licenses(reader)?;
    let summary = ImportSummary::tally(&store.insert_license_batch(&rows)?);
    tracing::info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "imported license rows"
    );
    Ok(summary)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

// Data rows are numbered from 2; row 1 is the header.
fn parse_forms<R: Read>(reader: R) -> Result<Vec<NewForm>, ImportError> {
    let mut forms = Vec::new();
    for (index, record) in csv_reader(reader).deserialize::<FormRow>().enumerate() {
        let row = record?;
        forms.push(row.into_form(index + 2)?);
    }
    Ok(forms)
}

fn parse_licenses<R: Read>(reader: R) -> Result<Vec<(Agent, NewLicense)>, ImportError> {
    let mut licenses = Vec::new();
    for (index, record) in csv_reader(reader).deserialize::<LicenseRow>().enumerate() {
        let row = record?;
        licenses.push(row.into_license(index + 2)?);
    }
    Ok(licenses)
}

#[derive(Debug, Deserialize)]
struct FormRow {
    company: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    full_company: Option<String>,
    state: String,
    form_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    full_form_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date: Option<String>,
    file_path: String,
}

impl FormRow {
    fn into_form(self, row: usize) -> Result<NewForm, ImportError> {
        let state = parse_state(&self.state, row)?;
        for (field, value) in [
            ("company", &self.company),
            ("form_type", &self.form_type),
            ("file_path", &self.file_path),
        ] {
            if value.is_empty() {
                return Err(ImportError::InvalidRow {
                    row,
                    reason: format!("{field} is required"),
                });
            }
        }

        Ok(NewForm {
            company: self.company,
            full_company: self
                .full_company
                .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string()),
            state,
            form_type: self.form_type,
            full_form_type: self
                .full_form_type
                .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string()),
            date: self.date.unwrap_or_else(|| DEFAULT_FORM_DATE.to_string()),
            file_path: self.file_path.replace('\\', "/"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LicenseRow {
    agent_id: String,
    username: String,
    state: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    license_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    expiration: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    color: Option<String>,
}

impl LicenseRow {
    fn into_license(self, row: usize) -> Result<(Agent, NewLicense), ImportError> {
        if self.agent_id.is_empty() || self.username.is_empty() {
            return Err(ImportError::InvalidRow {
                row,
                reason: "agent_id and username are required".to_string(),
            });
        }
        let state = parse_state(&self.state, row)?;

        let expiration = match self.expiration.as_deref() {
            Some(raw) => parse_date(raw).ok_or_else(|| ImportError::InvalidRow {
                row,
                reason: format!("expiration '{raw}' is not YYYY-MM-DD or MM/DD/YYYY"),
            })?,
            None => no_expiration(),
        };

        let color = self
            .color
            .unwrap_or_else(|| DEFAULT_LICENSE_COLOR.to_string());
        if !is_hex_color(&color) {
            return Err(ImportError::InvalidRow {
                row,
                reason: format!("color '{color}' is not #RRGGBB"),
            });
        }

        let agent_id = AgentId(self.agent_id);
        let agent = Agent {
            id: agent_id.clone(),
            username: self.username,
        };
        let license = NewLicense {
            agent_id,
            state,
            license_number: self
                .license_number
                .unwrap_or_else(|| DEFAULT_LICENSE_NUMBER.to_string()),
            expiration,
            color,
        };
        Ok((agent, license))
    }
}

fn parse_state(raw: &str, row: usize) -> Result<StateCode, ImportError> {
    StateCode::parse(raw).map_err(|err| ImportError::InvalidRow {
        row,
        reason: err.to_string(),
    })
}

// License tables print US-style dates; the database uses ISO.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_rows_fill_defaults() {
        let csv = "company,full_company,state,form_type,full_form_type,date,file_path\n\
MOO,Mutual of Omaha,IA,OC,,,static\\Companies\\MOO_IA_OC.pdf\n\
ACE,,TX,MS_APP,Medicare Supplement Application,2024,static/Companies/ACE_TX_MS_APP-2024.pdf\n";

        let forms = parse_forms(csv.as_bytes()).expect("rows parse");
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].full_form_type, "N");
        assert_eq!(forms[0].date, "None");
        assert_eq!(forms[0].file_path, "static/Companies/MOO_IA_OC.pdf");
        assert_eq!(forms[1].full_company, "N");
        assert_eq!(forms[1].date, "2024");
    }

    #[test]
    fn form_rows_reject_unknown_states() {
        let csv = "company,full_company,state,form_type,full_form_type,date,file_path\n\
MOO,Mutual of Omaha,ZZ,OC,,,static/Companies/MOO_ZZ_OC.pdf\n";

        match parse_forms(csv.as_bytes()) {
            Err(ImportError::InvalidRow { row, reason }) => {
                assert_eq!(row, 2);
                assert!(reason.contains("ZZ"));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn license_rows_accept_both_date_styles() {
        let csv = "agent_id,username,state,license_number,expiration,color\n\
7,jdoe,IA,IA-1001,2026-06-01,\n\
7,jdoe,TX,,03/15/2026,#ff0000\n\
7,jdoe,NE,,,\n";

        let rows = parse_licenses(csv.as_bytes()).expect("rows parse");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].1.license_number, "IA-1001");
        assert_eq!(rows[0].1.color, DEFAULT_LICENSE_COLOR);
        assert_eq!(
            rows[1].1.expiration,
            NaiveDate::from_ymd_opt(2026, 3, 15).expect("valid date")
        );
        assert_eq!(rows[1].1.license_number, DEFAULT_LICENSE_NUMBER);
        assert_eq!(rows[2].1.expiration, no_expiration());
        assert_eq!(rows[2].0.username, "jdoe");
    }

    #[test]
    fn license_rows_reject_bad_colors() {
        let csv = "agent_id,username,state,license_number,expiration,color\n\
7,jdoe,IA,IA-1001,2026-06-01,blue\n";

        assert!(matches!(
            parse_licenses(csv.as_bytes()),
            Err(ImportError::InvalidRow { row: 2, .. })
        ));
    }
}
