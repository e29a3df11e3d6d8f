use std::path::{Path, PathBuf};

use crate::{error::ShotplanResult, jobs::RenderJobDefinition};

/// Encoded artifact for one scene job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub job_id: String,
    pub scene_id: String,
    pub order: i32,
    pub output_path: PathBuf,
    pub duration: f64, // seconds
}

impl RenderResult {
    /// Result describing `job` as rendered to its own output path with its estimated duration.
    pub fn for_job(job: &RenderJobDefinition) -> Self {
        Self {
            job_id: job.job_id.clone(),
            scene_id: job.scene_id.clone(),
            order: job.order,
            output_path: job.output_path.clone(),
            duration: job.estimated_duration,
        }
    }
}

/// Media encoding capability used by the [`Orchestrator`](crate::Orchestrator).
///
/// `render` is called concurrently from several tasks; `stitch` once per render call, after
/// every scene succeeded, with results already sorted by scene order.
#[async_trait::async_trait]
pub trait SceneRenderer: Send + Sync {
    async fn render(&self, job: &RenderJobDefinition) -> ShotplanResult<RenderResult>;

    /// Concatenate `results` in the given order into one artifact at `output_path`.
    async fn stitch(&self, results: &[RenderResult], output_path: &Path)
    -> ShotplanResult<PathBuf>;
}
