use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::licensing::documents::DocumentGate;
use crate::licensing::domain::{Agent, AgentId, Form, FormId, LicenseId, LicensedState};
use crate::licensing::repository::{
    sort_licenses, FormRepository, LicenseRepository, StoreError,
};
use crate::licensing::service::LookupService;
use crate::licensing::states::StateCode;

pub(super) const MARKER: &str = "static/Companies";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
}

pub(super) fn days_from_today(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}

pub(super) fn state(code: &str) -> StateCode {
    StateCode::parse(code).expect("valid state")
}

pub(super) fn agent_id() -> AgentId {
    AgentId("agent-7".to_string())
}

#[derive(Default)]
pub(super) struct MemoryStore {
    agents: Mutex<Vec<Agent>>,
    licenses: Mutex<Vec<LicensedState>>,
    forms: Mutex<Vec<Form>>,
}

impl MemoryStore {
    pub(super) fn with_agent(self, id: &AgentId, username: &str) -> Self {
        self.agents
            .lock()
            .expect("agent mutex poisoned")
            .push(Agent {
                id: id.clone(),
                username: username.to_string(),
            });
        self
    }

    pub(super) fn with_license(
        self,
        agent: &AgentId,
        code: &str,
        number: &str,
        expiration: NaiveDate,
    ) -> Self {
        {
            let mut licenses = self.licenses.lock().expect("license mutex poisoned");
            let id = LicenseId(licenses.len() as i64 + 1);
            licenses.push(LicensedState {
                id,
                agent_id: agent.clone(),
                state: state(code),
                license_number: number.to_string(),
                expiration,
                color: "#0692e1".to_string(),
            });
        }
        self
    }

    pub(super) fn with_form(
        self,
        company: &str,
        full_company: &str,
        code: &str,
        path: &str,
    ) -> Self {
        {
            let mut forms = self.forms.lock().expect("form mutex poisoned");
            let id = FormId(forms.len() as i64 + 1);
            forms.push(Form {
                id,
                company: company.to_string(),
                full_company: full_company.to_string(),
                state: state(code),
                form_type: "OC".to_string(),
                full_form_type: "Medicare Supplement Coverage Outline".to_string(),
                date: "None".to_string(),
                file_path: path.to_string(),
            });
        }
        self
    }

    fn filtered(&self, keep: impl Fn(&LicensedState) -> bool) -> Vec<LicensedState> {
        let mut licenses: Vec<LicensedState> = self
            .licenses
            .lock()
            .expect("license mutex poisoned")
            .iter()
            .filter(|license| keep(license))
            .cloned()
            .collect();
        sort_licenses(&mut licenses);
        licenses
    }
}

impl LicenseRepository for MemoryStore {
    fn agent(&self, id: &AgentId) -> Result<Option<Agent>, StoreError> {
        Ok(self
            .agents
            .lock()
            .expect("agent mutex poisoned")
            .iter()
            .find(|agent| &agent.id == id)
            .cloned())
    }

    fn licenses_for_agent(&self, agent: &AgentId) -> Result<Vec<LicensedState>, StoreError> {
        Ok(self.filtered(|license| &license.agent_id == agent))
    }

    fn licenses_in_state(
        &self,
        agent: &AgentId,
        state: StateCode,
    ) -> Result<Vec<LicensedState>, StoreError> {
        Ok(self.filtered(|license| &license.agent_id == agent && license.state == state))
    }

    fn licenses_expiring_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LicensedState>, StoreError> {
        Ok(self.filtered(|license| license.expiration >= from && license.expiration <= to))
    }

    fn licenses_expired_before(&self, date: NaiveDate) -> Result<Vec<LicensedState>, StoreError> {
        Ok(self.filtered(|license| license.expiration < date))
    }
}

impl FormRepository for MemoryStore {
    fn forms_for_state(&self, state: StateCode) -> Result<Vec<Form>, StoreError> {
        let mut forms: Vec<Form> = self
            .forms
            .lock()
            .expect("form mutex poisoned")
            .iter()
            .filter(|form| form.state == state)
            .cloned()
            .collect();
        forms.sort_by(|a, b| a.company.cmp(&b.company).then(a.id.cmp(&b.id)));
        Ok(forms)
    }

    fn form(&self, id: FormId) -> Result<Option<Form>, StoreError> {
        Ok(self
            .forms
            .lock()
            .expect("form mutex poisoned")
            .iter()
            .find(|form| form.id == id)
            .cloned())
    }
}

pub(super) struct UnavailableStore;

impl LicenseRepository for UnavailableStore {
    fn agent(&self, _id: &AgentId) -> Result<Option<Agent>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn licenses_for_agent(&self, _agent: &AgentId) -> Result<Vec<LicensedState>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn licenses_in_state(
        &self,
        _agent: &AgentId,
        _state: StateCode,
    ) -> Result<Vec<LicensedState>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn licenses_expiring_between(
        &self,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<LicensedState>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn licenses_expired_before(&self, _date: NaiveDate) -> Result<Vec<LicensedState>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl FormRepository for UnavailableStore {
    fn forms_for_state(&self, _state: StateCode) -> Result<Vec<Form>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn form(&self, _id: FormId) -> Result<Option<Form>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Two Texas carriers and one Iowa carrier; the agent holds an Iowa license.
pub(super) fn populated_store() -> MemoryStore {
    MemoryStore::default()
        .with_agent(&agent_id(), "jdoe")
        .with_license(&agent_id(), "IA", "IA-0001", days_from_today(200))
        .with_form("MOO", "Mutual of Omaha", "TX", "static/Companies/MOO_TX_OC.pdf")
        .with_form("ACE", "Ace Chubb", "TX", "../../static/Companies/ACE_TX_BR.pdf")
        .with_form("AETNA", "Aetna", "TX", "static/Companies/AETNA_TX_OC.pdf")
        .with_form("MOO", "Mutual of Omaha", "IA", "Companies/MOO_IA_OC.pdf")
}

pub(super) fn service_over<S>(store: S, root: &std::path::Path) -> LookupService<S, S>
where
    S: LicenseRepository + FormRepository + 'static,
{
    let store = Arc::new(store);
    LookupService::new(store.clone(), store, DocumentGate::new(root, MARKER))
}

pub(super) fn write_document(root: &std::path::Path, name: &str, contents: &[u8]) {
    let folder = root.join("static").join("Companies");
    std::fs::create_dir_all(&folder).expect("create document folders");
    std::fs::write(folder.join(name), contents).expect("write document");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
