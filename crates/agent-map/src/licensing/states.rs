//! Process-wide lookup tables: state codes to names, carriers to agent portals.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;

const STATES: [(&str, &str); 51] = [
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DC", "District of Columbia"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

// Keyed by the full company name as stored on forms.
const COMPANY_PORTALS: [(&str, &str); 17] = [
    (
        "Ace Chubb",
        "https://service.iasadmin.com/gateway/login.aspx?pp=pFHD&pn=NR&y1tv0=n",
    ),
    ("Aflac", "https://www.suppinsadmin.com/ssitpa/afl/login.fcc"),
    (
        "American Benefit Life",
        "https://www.suppinsadmin.com/ssitpa/abl/login.fcc",
    ),
    (
        "American Financial Security",
        "https://www.suppinsadmin.com/ssitpa/afs/login.fcc",
    ),
    (
        "American Home Life",
        "https://www.suppinsadmin.com/ssitpa/amh/login.fcc",
    ),
    (
        "Bankers Fidelity Atlantic American",
        "https://agent.bflic.com/Login/Login?usrtyp=A",
    ),
    (
        "Cigna Health and Life Insurance",
        "https://agentviewcigna.com/AgentView/",
    ),
    (
        "Cigna National Health Insurance",
        "https://agentviewcigna.com/AgentView/",
    ),
    (
        "Cigna Loyal American Life Insurance",
        "https://agentviewcigna.com/AgentView/",
    ),
    (
        "LifeShield National Insurance",
        "https://lsneapp.com/forms/medicare",
    ),
    ("Lumico", "https://lumicoagentcenter.com/core/login"),
    (
        "Manhattan Life",
        "https://producer.manhattanlife.com/life/account/login.aspx",
    ),
    ("Medico", "https://mic.gomedico.com/login.aspx"),
    (
        "Mutual of Omaha",
        "https://www3.mutualofomaha.com/OktaSpaRegistration/home",
    ),
    (
        "New Era",
        "https://apps.neweralife.com/agentportal/account/login",
    ),
    ("Philadelphia American Life Insurance", "https://my.aimc.net/"),
    ("WPS Health Insurance", "https://my.wpshealth.com/en/AgentInd"),
];

/// Raised for codes outside the fifty states plus DC.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state code '{0}'")]
pub struct UnknownState(pub String);

/// Two-letter postal code that is guaranteed to be in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StateCode(&'static str);

impl StateCode {
    /// Codes are matched exactly; callers pass uppercase postal codes.
    pub fn parse(code: &str) -> Result<Self, UnknownState> {
        StateCatalog::global()
            .names
            .get_key_value(code)
            .map(|(key, _)| StateCode(key))
            .ok_or_else(|| UnknownState(code.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn full_name(&self) -> &'static str {
        StateCatalog::global()
            .names
            .get(self.0)
            .copied()
            .unwrap_or(self.0)
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Read-only catalog built once per process.
#[derive(Debug)]
pub struct StateCatalog {
    names: HashMap<&'static str, &'static str>,
    portals: HashMap<&'static str, &'static str>,
}

impl StateCatalog {
    pub fn global() -> &'static StateCatalog {
        static CATALOG: OnceLock<StateCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| StateCatalog {
            names: STATES.into_iter().collect(),
            portals: COMPANY_PORTALS.into_iter().collect(),
        })
    }

    pub fn full_name(&self, code: &str) -> Result<&'static str, UnknownState> {
        self.names
            .get(code)
            .copied()
            .ok_or_else(|| UnknownState(code.to_string()))
    }

    /// `None` is expected: not every carrier has an agent portal on file.
    pub fn portal_url(&self, company_full_name: &str) -> Option<&'static str> {
        self.portals.get(company_full_name).copied()
    }

    /// All codes in table order.
    pub fn codes(&self) -> impl Iterator<Item = StateCode> {
        STATES.iter().map(|&(code, _)| StateCode(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_a_name() {
        let catalog = StateCatalog::global();
        assert_eq!(catalog.codes().count(), 51);
        for code in catalog.codes() {
            let name = catalog.full_name(code.as_str()).expect("code is known");
            assert!(!name.is_empty(), "{code} has an empty name");
            assert_eq!(code.full_name(), name);
        }
    }

    #[test]
    fn rejects_codes_outside_the_table() {
        let catalog = StateCatalog::global();
        for code in ["ZZ", "tx", "", "TEX", "PR"] {
            assert_eq!(
                catalog.full_name(code),
                Err(UnknownState(code.to_string()))
            );
            assert!(StateCode::parse(code).is_err());
        }
    }

    #[test]
    fn district_of_columbia_is_included() {
        let code = StateCode::parse("DC").expect("DC is listed");
        assert_eq!(code.full_name(), "District of Columbia");
    }

    #[test]
    fn portal_lookup_distinguishes_missing_carriers() {
        let catalog = StateCatalog::global();
        assert_eq!(
            catalog.portal_url("Lumico"),
            Some("https://lumicoagentcenter.com/core/login")
        );
        assert_eq!(catalog.portal_url("Aetna"), None);
        assert_eq!(catalog.portal_url("LUMICO"), None);
    }
}
