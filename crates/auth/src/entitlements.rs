use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use fintrack_core::{DomainError, DomainResult};

use crate::user::User;

/// A feature flag granted to an individual account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entitlement {
    /// Access to the gated `interest` section.
    InterestSection,
}

impl Entitlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entitlement::InterestSection => "interest_section",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "interest_section" => Some(Entitlement::InterestSection),
            _ => None,
        }
    }

    fn denial(&self) -> &'static str {
        match self {
            Entitlement::InterestSection => {
                "Access denied. Interest section is not available for your account."
            }
        }
    }
}

impl core::fmt::Display for Entitlement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fail with `AccessDenied` unless `user` holds `entitlement`.
pub fn require_entitlement(user: &User, entitlement: Entitlement) -> DomainResult<()> {
    if user.has_entitlement(entitlement) {
        Ok(())
    } else {
        Err(DomainError::access_denied(entitlement.denial()))
    }
}

/// Decides which entitlements a newly registered account starts with.
#[derive(Debug, Clone, Default)]
pub struct EntitlementPolicy {
    interest_section_emails: HashSet<String>,
}

impl EntitlementPolicy {
    pub fn new<I, S>(interest_section_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            interest_section_emails: interest_section_emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// `email` is expected already normalised (trimmed, lowercase).
    pub fn grants_for(&self, email: &str) -> BTreeSet<Entitlement> {
        let mut grants = BTreeSet::new();
        if self.interest_section_emails.contains(email) {
            grants.insert(Entitlement::InterestSection);
        }
        grants
    }
}
