//! Per-agent expiration notices. Rendering only; delivery happens elsewhere.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::domain::{Agent, AgentId, LicensedState};
use super::expiration::EXPIRING_SOON_WINDOW_DAYS;
use super::repository::{LicenseRepository, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Expiring,
    Expired,
}

impl NoticeKind {
    pub fn subject(&self) -> &'static str {
        match self {
            NoticeKind::Expiring => "License Expiration Notice",
            NoticeKind::Expired => "Expired License Deletion Notice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirationNotice {
    pub kind: NoticeKind,
    pub agent: Agent,
    pub licenses: Vec<LicensedState>,
}

impl ExpirationNotice {
    pub fn subject(&self) -> &'static str {
        self.kind.subject()
    }

    pub fn body(&self) -> String {
        let mut body = match self.kind {
            NoticeKind::Expiring => format!(
                "You have {} license(s) expiring within {} days:\n",
                self.licenses.len(),
                EXPIRING_SOON_WINDOW_DAYS
            ),
            NoticeKind::Expired => {
                "The following licenses have expired and been deleted:\n".to_string()
            }
        };

        for license in &self.licenses {
            match self.kind {
                NoticeKind::Expiring => body.push_str(&format!(
                    "License {} in state {} expires on {}\n",
                    license.license_number,
                    license.state,
                    license.expiration.format("%m/%d/%Y")
                )),
                NoticeKind::Expired => body.push_str(&format!(
                    "License {} in state {}\n",
                    license.license_number, license.state
                )),
            }
        }

        if self.kind == NoticeKind::Expired {
            body.push_str("Please contact the licensing team to renew.\n");
        }
        body
    }
}

/// Licenses expiring in `today..=today + 31 days`, one notice per agent.
pub fn expiring_notices<R: LicenseRepository + ?Sized>(
    repository: &R,
    today: NaiveDate,
) -> Result<Vec<ExpirationNotice>, StoreError> {
    let until = today + Duration::days(EXPIRING_SOON_WINDOW_DAYS);
    let licenses = repository.licenses_expiring_between(today, until)?;
    group_by_agent(repository, NoticeKind::Expiring, licenses)
}

/// Licenses whose expiration is before `today`, one notice per agent.
pub fn expired_notices<R: LicenseRepository + ?Sized>(
    repository: &R,
    today: NaiveDate,
) -> Result<Vec<ExpirationNotice>, StoreError> {
    let licenses = repository.licenses_expired_before(today)?;
    group_by_agent(repository, NoticeKind::Expired, licenses)
}

fn group_by_agent<R: LicenseRepository + ?Sized>(
    repository: &R,
    kind: NoticeKind,
    licenses: Vec<LicensedState>,
) -> Result<Vec<ExpirationNotice>, StoreError> {
    let mut grouped: BTreeMap<AgentId, Vec<LicensedState>> = BTreeMap::new();
    for license in licenses {
        grouped
            .entry(license.agent_id.clone())
            .or_default()
            .push(license);
    }

    let mut notices = Vec::with_capacity(grouped.len());
    for (agent_id, licenses) in grouped {
        let agent = match repository.agent(&agent_id)? {
            Some(agent) => agent,
            None => {
                tracing::warn!(agent_id = %agent_id, "license references a missing agent");
                continue;
            }
        };
        notices.push(ExpirationNotice {
            kind,
            agent,
            licenses,
        });
    }
    Ok(notices)
}
