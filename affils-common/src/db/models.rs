//! Database models

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Affiliation group type
///
/// The type decides the expert panel ID band and the working group rules,
/// and is immutable once the affiliation has been created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffiliationType {
    /// Gene Curation Expert Panel
    Gcep,
    /// Variant Curation Expert Panel
    Vcep,
    /// Somatic Cancer Variant Curation Expert Panel
    ScVcep,
    /// Independent Curation Group
    IndependentCuration,
}

impl AffiliationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffiliationType::Gcep => "GCEP",
            AffiliationType::Vcep => "VCEP",
            AffiliationType::ScVcep => "SC_VCEP",
            AffiliationType::IndependentCuration => "INDEPENDENT_CURATION",
        }
    }
}

impl FromStr for AffiliationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GCEP" => Ok(AffiliationType::Gcep),
            "VCEP" => Ok(AffiliationType::Vcep),
            "SC_VCEP" => Ok(AffiliationType::ScVcep),
            "INDEPENDENT_CURATION" => Ok(AffiliationType::IndependentCuration),
            other => Err(Error::invalid_input(
                "type",
                format!("Unknown affiliation type: {}", other),
            )),
        }
    }
}

impl fmt::Display for AffiliationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Affiliation lifecycle status
///
/// An opaque label: the value set is validated but transitions carry no
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffiliationStatus {
    Applying,
    Active,
    Inactive,
    Retired,
    Archived,
}

impl AffiliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffiliationStatus::Applying => "APPLYING",
            AffiliationStatus::Active => "ACTIVE",
            AffiliationStatus::Inactive => "INACTIVE",
            AffiliationStatus::Retired => "RETIRED",
            AffiliationStatus::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for AffiliationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPLYING" => Ok(AffiliationStatus::Applying),
            "ACTIVE" => Ok(AffiliationStatus::Active),
            "INACTIVE" => Ok(AffiliationStatus::Inactive),
            "RETIRED" => Ok(AffiliationStatus::Retired),
            "ARCHIVED" => Ok(AffiliationStatus::Archived),
            other => Err(Error::invalid_input(
                "status",
                format!("Unknown affiliation status: {}", other),
            )),
        }
    }
}

impl fmt::Display for AffiliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clinical domain working group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingGroup {
    pub id: i64,
    pub name: String,
}

/// A stored affiliation row (children not included)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliationRow {
    /// Internal row key
    pub id: i64,
    pub affiliation_id: i64,
    pub expert_panel_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: AffiliationType,
    pub status: AffiliationStatus,
    pub full_name: String,
    pub short_name: Option<String>,
    pub working_group_id: i64,
    pub members: Option<String>,
    pub is_deleted: bool,
    pub external_uuid: Option<Uuid>,
}

/// A coordinator attached to one affiliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinator {
    pub coordinator_name: String,
    pub coordinator_email: String,
}

/// An approver attached to one affiliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub approver_name: String,
}

/// An external submitter registry identifier attached to one affiliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitterId {
    pub clinvar_submitter_id: String,
}
