//! Support category enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the fixed departments a student ticket can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Accounts, passwords, devices, and campus systems.
    #[serde(rename = "Information Technology")]
    InformationTechnology,
    /// Learning management system and course tooling.
    #[serde(rename = "Learning Technologies")]
    LearningTechnologies,
    /// General student services.
    #[serde(rename = "Student Services")]
    StudentServices,
    /// International student affairs.
    #[serde(rename = "International Affairs")]
    InternationalAffairs,
    /// Enrollment, transcripts, and academic records.
    #[serde(rename = "Registrar")]
    Registrar,
    /// Billing and student account balances.
    #[serde(rename = "Student Accounts")]
    StudentAccounts,
    /// Grants, loans, and scholarships.
    #[serde(rename = "Financial Aid")]
    FinancialAid,
    /// Alumni relations and career services.
    #[serde(rename = "Alumni Affairs and Career Services")]
    AlumniAndCareerServices,
    /// Military and veteran benefits.
    #[serde(rename = "Military / Veterans")]
    MilitaryVeterans,
    /// Clubs, events, and campus life.
    #[serde(rename = "Student Life")]
    StudentLife,
    /// Course design and learning experience.
    #[serde(rename = "Learning Experience Design (LXD) Team")]
    LearningExperienceDesign,
}

impl Category {
    /// Every category in canonical order.
    pub const ALL: [Self; 11] = [
        Self::InformationTechnology,
        Self::LearningTechnologies,
        Self::StudentServices,
        Self::InternationalAffairs,
        Self::Registrar,
        Self::StudentAccounts,
        Self::FinancialAid,
        Self::AlumniAndCareerServices,
        Self::MilitaryVeterans,
        Self::StudentLife,
        Self::LearningExperienceDesign,
    ];

    /// Returns the display label, which is also the wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InformationTechnology => "Information Technology",
            Self::LearningTechnologies => "Learning Technologies",
            Self::StudentServices => "Student Services",
            Self::InternationalAffairs => "International Affairs",
            Self::Registrar => "Registrar",
            Self::StudentAccounts => "Student Accounts",
            Self::FinancialAid => "Financial Aid",
            Self::AlumniAndCareerServices => "Alumni Affairs and Career Services",
            Self::MilitaryVeterans => "Military / Veterans",
            Self::StudentLife => "Student Life",
            Self::LearningExperienceDesign => "Learning Experience Design (LXD) Team",
        }
    }

    /// Looks up a category by its exact label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == label)
    }

    /// Returns all labels joined with `", "`, for error messages and prompts.
    #[must_use]
    pub fn joined_labels() -> String {
        Self::ALL
            .iter()
            .map(|category| category.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown category `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique_and_resolvable() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.as_str()), Some(category));
        }
        let mut labels: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 11);
    }

    #[test]
    fn label_match_is_exact() {
        assert!(Category::from_label("registrar").is_none());
        assert!(Category::from_label("Registrar ").is_none());
        assert!("Unknown Office".parse::<Category>().is_err());
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&Category::MilitaryVeterans).unwrap();
        assert_eq!(json, "\"Military / Veterans\"");
    }
}
