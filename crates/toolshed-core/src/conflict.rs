//! Key-namespace disjointness between a Resource and the Apps bound to it.
//!
//! Both directions compare key sets only, per category, and only for the
//! categories the candidate change actually supplies. Callers pass a snapshot of
//! the counterpart side; nothing here walks relationships.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DomainError, Result};
use crate::ids::AppId;
use crate::parameters::{ParameterCategory, ParameterChanges, ParameterSet, key_set};

/// Snapshot of one App's parameters, as seen from its Resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundAppParameters {
    pub app_id: AppId,
    pub app_name: String,
    pub parameters: ParameterSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConflict {
    pub category: ParameterCategory,
    pub keys: Vec<String>,
}

impl CategoryConflict {
    fn describe(&self) -> String {
        format!("{} [{}]", self.category, self.keys.join(", "))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictValidator;

impl ConflictValidator {
    /// App-side change against the Resource the App is bound to.
    pub fn check_resource_to_app_conflicts(
        resource_parameters: &ParameterSet,
        candidate_app_changes: &ParameterChanges,
    ) -> Result<()> {
        let conflicts = Self::find_conflicts(resource_parameters, candidate_app_changes);
        if conflicts.is_empty() {
            return Ok(());
        }

        let detail = conflicts
            .iter()
            .map(CategoryConflict::describe)
            .collect::<Vec<_>>()
            .join("; ");
        warn!(conflicts = %detail, "app parameters overlap resource parameters");
        Err(DomainError::conflict(format!(
            "app parameters already defined by resource: {detail}"
        )))
    }

    /// Resource-side change against every App bound to the Resource.
    pub fn check_app_to_resource_conflicts(
        bound_apps: &[BoundAppParameters],
        candidate_resource_changes: &ParameterChanges,
    ) -> Result<()> {
        let mut entries = Vec::new();
        for app in bound_apps {
            for conflict in Self::find_conflicts(&app.parameters, candidate_resource_changes) {
                entries.push(format!(
                    "app `{}` ({}) {}",
                    app.app_name,
                    app.app_id,
                    conflict.describe()
                ));
            }
        }
        if entries.is_empty() {
            return Ok(());
        }

        let detail = entries.join("; ");
        warn!(conflicts = %detail, "resource parameters overlap bound app parameters");
        Err(DomainError::conflict(format!(
            "resource parameters already defined by bound apps: {detail}"
        )))
    }

    /// Overlapping keys per supplied category, in canonical category order.
    #[must_use]
    pub fn find_conflicts(
        existing: &ParameterSet,
        candidate: &ParameterChanges,
    ) -> Vec<CategoryConflict> {
        ParameterCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let proposed = key_set(candidate.category(category)?);
                let keys = existing
                    .keys(category)
                    .intersection(&proposed)
                    .map(|key| (*key).to_string())
                    .collect::<Vec<_>>();
                (!keys.is_empty()).then_some(CategoryConflict { category, keys })
            })
            .collect()
    }

    /// True when no category of `left` shares a key with the same category of `right`.
    #[must_use]
    pub fn is_disjoint(left: &ParameterSet, right: &ParameterSet) -> bool {
        ParameterCategory::ALL.into_iter().all(|category| {
            let left_keys: BTreeSet<&str> = left.keys(category);
            left_keys.is_disjoint(&right.keys(category))
        })
    }
}
