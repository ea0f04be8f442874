use core::str::FromStr;

use serde::{Deserialize, Serialize};

use fintrack_core::DomainError;

/// One of the five fixed categories partitioning persons and their transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Lending,
    Borrowing,
    Earnings,
    Expenses,
    Interest,
}

impl SectionType {
    pub const ALL: [SectionType; 5] = [
        SectionType::Lending,
        SectionType::Borrowing,
        SectionType::Earnings,
        SectionType::Expenses,
        SectionType::Interest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Lending => "lending",
            SectionType::Borrowing => "borrowing",
            SectionType::Earnings => "earnings",
            SectionType::Expenses => "expenses",
            SectionType::Interest => "interest",
        }
    }

    /// Whether reading or writing persons in this section is feature-gated.
    pub fn is_gated(&self) -> bool {
        matches!(self, SectionType::Interest)
    }
}

impl core::fmt::Display for SectionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionType::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| DomainError::invalid_field("sectionType", "Invalid section type"))
    }
}
