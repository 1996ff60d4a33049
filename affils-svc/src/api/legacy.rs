//! Legacy aggregate view
//!
//! The historical downstream feed groups sibling GCEP/VCEP/SC_VCEP records
//! sharing one affiliation ID into a single composite with nested subgroup
//! entries, renders identifiers as strings, treats SC_VCEP as a VCEP
//! subgroup alias and flattens approver names into one list. The view is a
//! pure transformation over already-validated stored data; it enforces no
//! invariants of its own.

use std::collections::BTreeMap;

use affils_common::db::models::AffiliationType;
use affils_common::Error;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::db::affiliations::{self, AffiliationRecord};
use crate::AppState;

/// One subgroup entry in the composite
#[derive(Debug, Clone, Serialize)]
pub struct LegacySubgroup {
    pub id: String,
    pub fullname: String,
}

/// One composite affiliation in the legacy feed shape
#[derive(Debug, Clone, Serialize)]
pub struct LegacyAffiliation {
    pub affiliation_id: String,
    pub affiliation_fullname: String,
    pub subgroups: BTreeMap<String, LegacySubgroup>,
    pub approver: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyDetailQuery {
    pub affil_id: i64,
}

/// GET /api/legacy/affiliations
pub async fn legacy_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<LegacyAffiliation>>, ApiError> {
    let records = affiliations::list_affiliations(&state.db).await?;
    Ok(Json(build_composites(records)))
}

/// GET /api/legacy/affiliation?affil_id=NNNNN
///
/// Returns a single-element list, matching the historical feed.
pub async fn legacy_detail(
    State(state): State<AppState>,
    Query(query): Query<LegacyDetailQuery>,
) -> Result<Json<Vec<LegacyAffiliation>>, ApiError> {
    let records = affiliations::list_affiliations(&state.db).await?;
    let composites: Vec<LegacyAffiliation> = build_composites(records)
        .into_iter()
        .filter(|c| c.affiliation_id == query.affil_id.to_string())
        .collect();

    if composites.is_empty() {
        return Err(ApiError(Error::NotFound(format!(
            "Affiliation {} not found",
            query.affil_id
        ))));
    }

    Ok(Json(composites))
}

/// Group records by affiliation ID and fold each group into one composite
pub fn build_composites(records: Vec<AffiliationRecord>) -> Vec<LegacyAffiliation> {
    let mut groups: BTreeMap<i64, Vec<AffiliationRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.affiliation_id).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(affiliation_id, siblings)| {
            let mut subgroups = BTreeMap::new();
            let mut approver = Vec::new();

            for record in &siblings {
                // SC_VCEP is reported under the vcep alias
                let key = match record.kind {
                    AffiliationType::Gcep => Some("gcep"),
                    AffiliationType::Vcep | AffiliationType::ScVcep => Some("vcep"),
                    AffiliationType::IndependentCuration => None,
                };

                if let (Some(key), Some(ep_id)) = (key, record.expert_panel_id) {
                    subgroups.insert(
                        key.to_string(),
                        LegacySubgroup {
                            id: ep_id.to_string(),
                            fullname: record.full_name.clone(),
                        },
                    );
                }

                approver.extend(record.approvers.iter().map(|a| a.approver_name.clone()));
            }

            LegacyAffiliation {
                affiliation_id: affiliation_id.to_string(),
                affiliation_fullname: siblings[0].full_name.clone(),
                subgroups,
                approver,
            }
        })
        .collect()
}
