use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::documents::{Document, DocumentGate, PathTraversalRejected};
use super::domain::{AgentId, Form, FormId, LicensedState};
use super::expiration::{self, ExpirationStatus};
use super::repository::{FormRepository, LicenseRepository, StoreError};
use super::states::{StateCatalog, StateCode, UnknownState};

/// Everything the companies page shows for one agent and state.
#[derive(Debug, Clone, Serialize)]
pub struct CompaniesInState {
    pub state_code: StateCode,
    pub state_name: &'static str,
    pub forms: Vec<Form>,
    #[serde(flatten)]
    pub expiration: ExpirationStatus,
    /// Agent portal per full company name; carriers without a portal are absent.
    pub portal_urls: BTreeMap<String, &'static str>,
}

/// Composes the catalogs, stores, and document gate behind the HTTP routes.
pub struct LookupService<L, F> {
    licenses: Arc<L>,
    forms: Arc<F>,
    gate: DocumentGate,
    catalog: &'static StateCatalog,
}

impl<L, F> LookupService<L, F>
where
    L: LicenseRepository + 'static,
    F: FormRepository + 'static,
{
    pub fn new(licenses: Arc<L>, forms: Arc<F>, gate: DocumentGate) -> Self {
        Self {
            licenses,
            forms,
            gate,
            catalog: StateCatalog::global(),
        }
    }

    pub fn companies_in_state(
        &self,
        agent: &AgentId,
        state_code: &str,
        today: NaiveDate,
    ) -> Result<CompaniesInState, LookupError> {
        let state = StateCode::parse(state_code)?;
        let forms = self.forms.forms_for_state(state)?;
        let state_name = self.catalog.full_name(state.as_str())?;
        let current = self.licenses.current_license(agent, state)?;
        let expiration = expiration::evaluate(current.as_ref(), today);

        let portal_urls = forms
            .iter()
            .filter_map(|form| {
                self.catalog
                    .portal_url(&form.full_company)
                    .map(|url| (form.full_company.clone(), url))
            })
            .collect();

        Ok(CompaniesInState {
            state_code: state,
            state_name,
            forms,
            expiration,
            portal_urls,
        })
    }

    /// Licenses for the agent map, ordered by state then expiration.
    pub fn licensed_states(&self, agent: &AgentId) -> Result<Vec<LicensedState>, LookupError> {
        if self.licenses.agent(agent)?.is_none() {
            return Err(LookupError::AgentNotFound(agent.clone()));
        }
        Ok(self.licenses.licenses_for_agent(agent)?)
    }

    /// Resolves the form's stored path and reads the document. No file is
    /// opened when the path fails containment.
    pub fn view_form(&self, form_id: FormId) -> Result<Document, LookupError> {
        let form = self
            .forms
            .form(form_id)?
            .ok_or(LookupError::FormNotFound(form_id))?;

        let path = match self.gate.resolve(&form.file_path) {
            Ok(path) => path,
            Err(rejected) => {
                tracing::warn!(
                    form_id = form_id.0,
                    stored_path = %form.file_path,
                    "rejected document path outside the document root"
                );
                return Err(rejected.into());
            }
        };

        self.gate
            .open(&path)
            .map_err(|source| LookupError::DocumentUnavailable {
                path: path.as_str().to_string(),
                source,
            })
    }
}

/// Error raised by the lookup service.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    UnknownState(#[from] UnknownState),
    #[error("form {0} not found")]
    FormNotFound(FormId),
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),
    #[error(transparent)]
    PathTraversalRejected(#[from] PathTraversalRejected),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("document {path} could not be read: {source}")]
    DocumentUnavailable { path: String, source: io::Error },
    #[error("lookup task did not complete: {0}")]
    Interrupted(String),
}

impl LookupError {
    /// Transient failures the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::Storage(StoreError::Unavailable(_)))
    }
}
