//! Edit requests: derive a child plan from a parent plus one mutation, then render it.
//!
//! Child identity follows a caller convention layered on the pure core, not an invariant of
//! [`apply_mutation`](crate::apply_mutation) or [`append_lineage`](crate::append_lineage):
//! - child id: `"{parentId}-edit-{entryId}"`
//! - child output path: the parent's with `-edit-{entryId}` inserted before the extension

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{
    error::ShotplanResult,
    lineage::{LineageEntry, append_lineage},
    model::ShotPlan,
    mutation::{AddressPolicy, Mutation, apply_mutation_with},
    orchestrator::{Orchestrator, RenderInputs, RenderOptions, RenderPlanOutcome},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub parent_plan: ShotPlan,
    pub mutation: Mutation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub parent: ShotPlan,
    pub child: ShotPlan,
    pub result: RenderPlanOutcome,
}

pub fn child_plan_id(parent_id: &str, entry_id: &str) -> String {
    format!("{parent_id}-edit-{entry_id}")
}

/// `renders/promo.mp4` + `abc` -> `renders/promo-edit-abc.mp4`.
pub fn child_output_path(parent: &Path, entry_id: &str) -> PathBuf {
    let stem = parent
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match parent.extension() {
        Some(ext) => format!("{stem}-edit-{entry_id}.{}", ext.to_string_lossy()),
        None => format!("{stem}-edit-{entry_id}"),
    };
    parent.with_file_name(name)
}

/// Apply `mutation` to `parent`, record it in the lineage and assign the child id and path.
pub fn derive_child_plan(
    parent: &ShotPlan,
    mutation: &Mutation,
    entry_id: &str,
    timestamp: DateTime<Utc>,
    policy: AddressPolicy,
) -> ShotplanResult<ShotPlan> {
    let mutated = apply_mutation_with(parent, mutation, policy)?;
    let entry = LineageEntry::new(entry_id, parent.id.clone(), mutation.clone(), timestamp);
    let with_lineage = append_lineage(&mutated, entry);

    Ok(ShotPlan {
        id: child_plan_id(&parent.id, entry_id),
        output_path: child_output_path(&parent.output_path, entry_id),
        ..with_lineage
    })
}

/// Derive the child plan for `request` with a fresh lineage entry id and render it.
#[tracing::instrument(
    skip_all,
    fields(parent_id = %request.parent_plan.id, kind = request.mutation.kind())
)]
pub async fn process_edit(
    orchestrator: &Orchestrator,
    request: EditRequest,
    policy: AddressPolicy,
) -> ShotplanResult<EditOutcome> {
    let entry_id = uuid::Uuid::new_v4().to_string();
    let child = derive_child_plan(
        &request.parent_plan,
        &request.mutation,
        &entry_id,
        Utc::now(),
        policy,
    )?;
    tracing::info!(child_id = %child.id, "derived child plan");

    let options = RenderOptions {
        languages: request.languages,
        caption_prompt: None,
    };
    let result = orchestrator
        .render(
            &RenderInputs {
                plan: child.clone(),
            },
            &options,
        )
        .await?;

    Ok(EditOutcome {
        parent: request.parent_plan,
        child,
        result,
    })
}
