//! SQLite-backed license store and form catalog.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

use super::domain::{
    Agent, AgentId, Form, FormId, LicenseId, LicensedState, NewForm, NewLicense,
};
use super::repository::{FormRepository, LicenseRepository, StoreError};
use super::states::StateCode;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS licensed_states (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
    state TEXT NOT NULL,
    license_number TEXT NOT NULL DEFAULT 'N/A',
    expiration TEXT NOT NULL DEFAULT '9999-12-31',
    color TEXT NOT NULL DEFAULT '#0692e1'
);

CREATE TABLE IF NOT EXISTS forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company TEXT NOT NULL,
    full_company TEXT NOT NULL DEFAULT 'N',
    state TEXT NOT NULL,
    form_type TEXT NOT NULL,
    full_form_type TEXT NOT NULL DEFAULT 'N',
    date TEXT NOT NULL DEFAULT 'None',
    file_path TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_licensed_states_agent ON licensed_states(agent_id, state);
CREATE INDEX IF NOT EXISTS idx_licensed_states_expiration ON licensed_states(expiration);
CREATE INDEX IF NOT EXISTS idx_forms_state ON forms(state, company);

-- Ingestion creates a form only if the same document is not already present
CREATE UNIQUE INDEX IF NOT EXISTS idx_forms_identity
    ON forms(company, state, form_type, date, file_path);

-- Re-importing a license already on file is a no-op
CREATE UNIQUE INDEX IF NOT EXISTS idx_licensed_states_identity
    ON licensed_states(agent_id, state, license_number);
"#;

const DATE_FORMAT: &str = "%Y-%m-%d";

const LICENSE_COLUMNS: &str = "id, agent_id, state, license_number, expiration, color";
const FORM_COLUMNS: &str =
    "id, company, full_company, state, form_type, full_form_type, date, file_path";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(store_error)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(store_error)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(store_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        self.lock()?.execute_batch(SCHEMA).map_err(store_error)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection mutex poisoned".to_string()))
    }

    /// Creates the agent or refreshes its username.
    pub fn upsert_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        upsert_agent_row(&*self.lock()?, agent)
    }

    /// Returns `None` when the agent already holds this license number in the state.
    pub fn insert_license(
        &self,
        license: &NewLicense,
    ) -> Result<Option<LicensedState>, StoreError> {
        insert_license_row(&*self.lock()?, license)
    }

    /// Returns `None` when an identical form is already stored.
    pub fn insert_form(&self, form: &NewForm) -> Result<Option<Form>, StoreError> {
        insert_form_row(&*self.lock()?, form)
    }

    /// Upserts each agent and inserts its license in one transaction. Slots
    /// are `None` for licenses that were already present.
    pub fn insert_license_batch(
        &self,
        rows: &[(Agent, NewLicense)],
    ) -> Result<Vec<Option<LicensedState>>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_error)?;
        let mut stored = Vec::with_capacity(rows.len());
        for (agent, license) in rows {
            upsert_agent_row(&tx, agent)?;
            stored.push(insert_license_row(&tx, license)?);
        }
        tx.commit().map_err(store_error)?;
        Ok(stored)
    }

    /// Inserts the forms in one transaction; duplicates come back as `None`.
    pub fn insert_form_batch(&self, forms: &[NewForm]) -> Result<Vec<Option<Form>>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_error)?;
        let mut stored = Vec::with_capacity(forms.len());
        for form in forms {
            stored.push(insert_form_row(&tx, form)?);
        }
        tx.commit().map_err(store_error)?;
        Ok(stored)
    }

    /// Deletes exactly the given license rows in one transaction.
    pub fn delete_licenses(&self, ids: &[LicenseId]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_error)?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx
                .execute("DELETE FROM licensed_states WHERE id = ?1", [id.0])
                .map_err(store_error)?;
        }
        tx.commit().map_err(store_error)?;
        Ok(deleted)
    }

    pub fn delete_agent_licenses(&self, agent: &AgentId) -> Result<usize, StoreError> {
        self.lock()?
            .execute(
                "DELETE FROM licensed_states WHERE agent_id = ?1",
                [agent.0.as_str()],
            )
            .map_err(store_error)
    }

    /// Removes the agent; its licenses go with it.
    pub fn delete_agent(&self, agent: &AgentId) -> Result<bool, StoreError> {
        let deleted = self
            .lock()?
            .execute("DELETE FROM agents WHERE id = ?1", [agent.0.as_str()])
            .map_err(store_error)?;
        Ok(deleted > 0)
    }

    pub fn delete_company_forms(&self, company: &str) -> Result<usize, StoreError> {
        self.lock()?
            .execute("DELETE FROM forms WHERE company = ?1", [company])
            .map_err(store_error)
    }

    fn query_licenses<P: Params>(
        &self,
        filter: &str,
        params: P,
    ) -> Result<Vec<LicensedState>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {LICENSE_COLUMNS} FROM licensed_states {filter}
             ORDER BY state, expiration, id"
        );
        let mut stmt = conn.prepare(&sql).map_err(store_error)?;
        let rows = stmt
            .query_map(params, LicenseRow::from_row)
            .map_err(store_error)?;

        let mut licenses = Vec::new();
        for row in rows {
            licenses.push(row.map_err(store_error)?.into_license()?);
        }
        Ok(licenses)
    }
}

impl LicenseRepository for SqliteStore {
    fn agent(&self, id: &AgentId) -> Result<Option<Agent>, StoreError> {
        self.lock()?
            .query_row(
                "SELECT id, username FROM agents WHERE id = ?1",
                [id.0.as_str()],
                |row| {
                    Ok(Agent {
                        id: AgentId(row.get(0)?),
                        username: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(store_error)
    }

    fn licenses_for_agent(&self, agent: &AgentId) -> Result<Vec<LicensedState>, StoreError> {
        self.query_licenses("WHERE agent_id = ?1", [agent.0.as_str()])
    }

    fn licenses_in_state(
        &self,
        agent: &AgentId,
        state: StateCode,
    ) -> Result<Vec<LicensedState>, StoreError> {
        self.query_licenses(
            "WHERE agent_id = ?1 AND state = ?2",
            [agent.0.as_str(), state.as_str()],
        )
    }

    fn licenses_expiring_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LicensedState>, StoreError> {
        self.query_licenses(
            "WHERE expiration BETWEEN ?1 AND ?2",
            [
                from.format(DATE_FORMAT).to_string(),
                to.format(DATE_FORMAT).to_string(),
            ],
        )
    }

    fn licenses_expired_before(&self, date: NaiveDate) -> Result<Vec<LicensedState>, StoreError> {
        self.query_licenses(
            "WHERE expiration < ?1",
            [date.format(DATE_FORMAT).to_string()],
        )
    }
}

impl FormRepository for SqliteStore {
    fn forms_for_state(&self, state: StateCode) -> Result<Vec<Form>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {FORM_COLUMNS} FROM forms WHERE state = ?1 ORDER BY company, id");
        let mut stmt = conn.prepare(&sql).map_err(store_error)?;
        let rows = stmt
            .query_map([state.as_str()], FormRow::from_row)
            .map_err(store_error)?;

        let mut forms = Vec::new();
        for row in rows {
            forms.push(row.map_err(store_error)?.into_form()?);
        }
        Ok(forms)
    }

    fn form(&self, id: FormId) -> Result<Option<Form>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {FORM_COLUMNS} FROM forms WHERE id = ?1");
        let row = conn
            .query_row(&sql, [id.0], FormRow::from_row)
            .optional()
            .map_err(store_error)?;
        row.map(FormRow::into_form).transpose()
    }
}

fn upsert_agent_row(conn: &Connection, agent: &Agent) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO agents (id, username) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET username = excluded.username",
        params![agent.id.0, agent.username],
    )
    .map_err(store_error)?;
    Ok(())
}

fn insert_license_row(
    conn: &Connection,
    license: &NewLicense,
) -> Result<Option<LicensedState>, StoreError> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO licensed_states
                (agent_id, state, license_number, expiration, color)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                license.agent_id.0,
                license.state.as_str(),
                license.license_number,
                license.expiration.format(DATE_FORMAT).to_string(),
                license.color,
            ],
        )
        .map_err(store_error)?;
    if inserted == 0 {
        return Ok(None);
    }

    Ok(Some(LicensedState {
        id: LicenseId(conn.last_insert_rowid()),
        agent_id: license.agent_id.clone(),
        state: license.state,
        license_number: license.license_number.clone(),
        expiration: license.expiration,
        color: license.color.clone(),
    }))
}

fn insert_form_row(conn: &Connection, form: &NewForm) -> Result<Option<Form>, StoreError> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO forms
                (company, full_company, state, form_type, full_form_type, date, file_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                form.company,
                form.full_company,
                form.state.as_str(),
                form.form_type,
                form.full_form_type,
                form.date,
                form.file_path,
            ],
        )
        .map_err(store_error)?;
    if inserted == 0 {
        return Ok(None);
    }

    Ok(Some(Form {
        id: FormId(conn.last_insert_rowid()),
        company: form.company.clone(),
        full_company: form.full_company.clone(),
        state: form.state,
        form_type: form.form_type.clone(),
        full_form_type: form.full_form_type.clone(),
        date: form.date.clone(),
        file_path: form.file_path.clone(),
    }))
}

// Decode failures and damaged files are `Corrupt`; constraint failures are
// `Rejected`. Only connection-level trouble is `Unavailable`.
fn store_error(err: rusqlite::Error) -> StoreError {
    use rusqlite::ErrorCode;

    match &err {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::Utf8Error(..) => StoreError::Corrupt(err.to_string()),
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase | ErrorCode::TypeMismatch => {
                StoreError::Corrupt(err.to_string())
            }
            ErrorCode::ConstraintViolation => StoreError::Rejected(err.to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        },
        _ => StoreError::Unavailable(err.to_string()),
    }
}

fn parse_state(raw: &str) -> Result<StateCode, StoreError> {
    StateCode::parse(raw).map_err(|err| StoreError::Corrupt(err.to_string()))
}

struct LicenseRow {
    id: i64,
    agent_id: String,
    state: String,
    license_number: String,
    expiration: String,
    color: String,
}

impl LicenseRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            agent_id: row.get(1)?,
            state: row.get(2)?,
            license_number: row.get(3)?,
            expiration: row.get(4)?,
            color: row.get(5)?,
        })
    }

    fn into_license(self) -> Result<LicensedState, StoreError> {
        let expiration = NaiveDate::parse_from_str(&self.expiration, DATE_FORMAT).map_err(|_| {
            StoreError::Corrupt(format!(
                "license {} has expiration '{}'",
                self.id, self.expiration
            ))
        })?;

        Ok(LicensedState {
            id: LicenseId(self.id),
            agent_id: AgentId(self.agent_id),
            state: parse_state(&self.state)?,
            license_number: self.license_number,
            expiration,
            color: self.color,
        })
    }
}

struct FormRow {
    id: i64,
    company: String,
    full_company: String,
    state: String,
    form_type: String,
    full_form_type: String,
    date: String,
    file_path: String,
}

impl FormRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            company: row.get(1)?,
            full_company: row.get(2)?,
            state: row.get(3)?,
            form_type: row.get(4)?,
            full_form_type: row.get(5)?,
            date: row.get(6)?,
            file_path: row.get(7)?,
        })
    }

    fn into_form(self) -> Result<Form, StoreError> {
        Ok(Form {
            id: FormId(self.id),
            company: self.company,
            full_company: self.full_company,
            state: parse_state(&self.state)?,
            form_type: self.form_type,
            full_form_type: self.full_form_type,
            date: self.date,
            file_path: self.file_path,
        })
    }
}
