use chrono::NaiveDate;

use super::domain::{Agent, AgentId, Form, FormId, LicensedState};
use super::states::StateCode;

/// Error enumeration for backing store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached; reads are safe to retry.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("stored row could not be decoded: {0}")]
    Corrupt(String),
    #[error("write rejected by a store constraint: {0}")]
    Rejected(String),
}

/// Read access to agents and their licenses.
pub trait LicenseRepository: Send + Sync {
    fn agent(&self, id: &AgentId) -> Result<Option<Agent>, StoreError>;

    /// Ordered by state code, then expiration ascending, then id.
    fn licenses_for_agent(&self, agent: &AgentId) -> Result<Vec<LicensedState>, StoreError>;

    fn licenses_in_state(
        &self,
        agent: &AgentId,
        state: StateCode,
    ) -> Result<Vec<LicensedState>, StoreError>;

    /// Licenses whose expiration falls in `from..=to`, across all agents.
    fn licenses_expiring_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LicensedState>, StoreError>;

    /// Licenses with `expiration < date`, across all agents.
    fn licenses_expired_before(&self, date: NaiveDate) -> Result<Vec<LicensedState>, StoreError>;

    fn current_license(
        &self,
        agent: &AgentId,
        state: StateCode,
    ) -> Result<Option<LicensedState>, StoreError> {
        let licenses = self.licenses_in_state(agent, state)?;
        Ok(select_current(licenses))
    }
}

/// Read access to the stored carrier forms.
pub trait FormRepository: Send + Sync {
    /// Ordered by company code, then id.
    fn forms_for_state(&self, state: StateCode) -> Result<Vec<Form>, StoreError>;

    fn form(&self, id: FormId) -> Result<Option<Form>, StoreError>;
}

/// Latest expiration wins; equal expirations go to the most recent insert.
pub fn select_current(licenses: Vec<LicensedState>) -> Option<LicensedState> {
    licenses
        .into_iter()
        .max_by(|a, b| a.expiration.cmp(&b.expiration).then(a.id.cmp(&b.id)))
}

/// Stable ordering used for agent license listings.
pub(crate) fn sort_licenses(licenses: &mut [LicensedState]) {
    licenses.sort_by(|a, b| {
        a.state
            .cmp(&b.state)
            .then(a.expiration.cmp(&b.expiration))
            .then(a.id.cmp(&b.id))
    });
}
