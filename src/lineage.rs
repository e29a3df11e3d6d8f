use chrono::{DateTime, Utc};

use crate::{model::ShotPlan, mutation::Mutation};

/// Audit record linking a derived plan to the plan and mutation it came from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEntry {
    pub id: String,
    pub parent_id: String,
    pub mutation: Mutation,
    pub timestamp: DateTime<Utc>,
}

impl LineageEntry {
    pub fn new(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        mutation: Mutation,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            mutation,
            timestamp,
        }
    }
}

/// Returns a copy of `parent` whose history ends with `entry` and whose `parentId` is
/// `parent.id`.
///
/// Callers pass the output of [`apply_mutation`](crate::apply_mutation), which still carries the
/// parent's id, and assign the child id afterwards (see
/// [`derive_child_plan`](crate::derive_child_plan)).
/// `parent` is not modified. Entries are appended in call order and never reordered or pruned.
pub fn append_lineage(parent: &ShotPlan, entry: LineageEntry) -> ShotPlan {
    let mut metadata = parent.metadata.clone().unwrap_or_default();
    metadata.lineage.push(entry);
    metadata.parent_id = Some(parent.id.clone());

    ShotPlan {
        metadata: Some(metadata),
        ..parent.clone()
    }
}

/// Ids of every ancestor recorded in `plan`'s history, oldest first.
pub fn ancestor_ids(plan: &ShotPlan) -> Vec<&str> {
    plan.lineage().iter().map(|e| e.parent_id.as_str()).collect()
}
