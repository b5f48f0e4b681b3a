//! Agent licensing status, carrier form lookup, and guarded document access.

pub mod documents;
pub mod domain;
pub mod expiration;
pub mod import;
pub mod notices;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;
pub mod states;

#[cfg(test)]
mod tests;

pub use documents::{Document, DocumentGate, PathTraversalRejected, SafeDocumentPath};
pub use domain::{Agent, AgentId, Form, FormId, LicenseId, LicensedState, NewForm, NewLicense};
pub use expiration::{evaluate, ExpirationStatus, EXPIRING_SOON_WINDOW_DAYS, NO_LICENSE_DAYS};
pub use import::{ImportError, ImportSummary};
pub use notices::{expired_notices, expiring_notices, ExpirationNotice, NoticeKind};
pub use repository::{select_current, FormRepository, LicenseRepository, StoreError};
pub use router::licensing_router;
pub use service::{CompaniesInState, LookupError, LookupService};
pub use sqlite::SqliteStore;
pub use states::{StateCatalog, StateCode, UnknownState};
