use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::stream::{FuturesUnordered, StreamExt as _};
use tokio::sync::Semaphore;
use tracing::Instrument as _;

use crate::{
    caption::{CaptionManager, CaptionOrchestrationResult, CaptionRequest, hinted_languages},
    config::{DEFAULT_CONCURRENCY, OrchestratorConfig},
    error::{ShotplanError, ShotplanResult},
    fingerprint::fingerprint_jobs,
    jobs::{RenderJobDefinition, derive_jobs},
    model::ShotPlan,
    render::{RenderResult, SceneRenderer},
};

#[derive(Clone, Debug)]
pub struct RenderInputs {
    pub plan: ShotPlan,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Caption languages. Empty or absent falls back to scene hints, then the configured defaults.
    pub languages: Option<Vec<String>>,
    pub caption_prompt: Option<String>,
}

/// Everything one render call produced.
///
/// `scenes` is in job (plan array) order; `stitched_path` was assembled in ascending scene order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlanOutcome {
    pub stitched_path: std::path::PathBuf,
    pub scenes: Vec<RenderResult>,
    pub captioning: CaptionOrchestrationResult,
    pub jobs: Vec<RenderJobDefinition>,
}

/// Renders a plan's scenes with bounded parallelism, stitches them and runs captioning.
///
/// There is no timeout or cancellation token; callers that need one wrap [`Orchestrator::render`]
/// (for example with `tokio::time::timeout`).
#[derive(Clone)]
pub struct Orchestrator {
    renderer: Arc<dyn SceneRenderer>,
    captions: Arc<dyn CaptionManager>,
    concurrency: usize,
    default_languages: Vec<String>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("concurrency", &self.concurrency)
            .field("default_languages", &self.default_languages)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(renderer: Arc<dyn SceneRenderer>, captions: Arc<dyn CaptionManager>) -> Self {
        Self {
            renderer,
            captions,
            concurrency: DEFAULT_CONCURRENCY,
            default_languages: vec!["en".to_string()],
        }
    }

    pub fn with_config(
        renderer: Arc<dyn SceneRenderer>,
        captions: Arc<dyn CaptionManager>,
        config: &OrchestratorConfig,
    ) -> ShotplanResult<Self> {
        config.validate()?;
        Ok(Self {
            renderer,
            captions,
            concurrency: config.concurrency,
            default_languages: config.default_languages.clone(),
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> ShotplanResult<Self> {
        if concurrency == 0 {
            return Err(ShotplanError::validation("concurrency must be >= 1"));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Render every scene of `inputs.plan`, stitch in scene order, then caption the result.
    ///
    /// The first scene failure is returned as-is; stitching and captioning do not run and
    /// scenes still waiting for a slot are never dispatched. Scenes already rendering are left
    /// to finish on their own.
    #[tracing::instrument(
        skip_all,
        fields(plan_id = %inputs.plan.id, concurrency = self.concurrency)
    )]
    pub async fn render(
        &self,
        inputs: &RenderInputs,
        options: &RenderOptions,
    ) -> ShotplanResult<RenderPlanOutcome> {
        let plan = &inputs.plan;
        plan.validate()?;
        let jobs = derive_jobs(plan)?;
        tracing::info!(
            jobs = jobs.len(),
            fingerprint = %fingerprint_jobs(&jobs),
            "rendering plan"
        );

        let scenes = self.render_scenes(&jobs).await?;

        let mut ordered = scenes.clone();
        ordered.sort_by_key(|r| r.order);
        let stitched_path = self.renderer.stitch(&ordered, &plan.output_path).await?;
        tracing::info!(path = %stitched_path.display(), "stitched scenes");

        let request = CaptionRequest {
            plan_id: plan.id.clone(),
            final_video_path: stitched_path.clone(),
            languages: self.resolve_languages(options, &jobs),
            prompt: options.caption_prompt.clone(),
            scene_jobs: jobs.clone(),
            render_results: scenes.clone(),
        };
        let captioning = self.captions.orchestrate(&request).await?;
        tracing::info!(bundles = captioning.bundles.len(), "captioning finished");

        Ok(RenderPlanOutcome {
            stitched_path,
            scenes,
            captioning,
            jobs,
        })
    }

    fn resolve_languages(
        &self,
        options: &RenderOptions,
        jobs: &[RenderJobDefinition],
    ) -> Vec<String> {
        let requested = options
            .languages
            .iter()
            .flatten()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>();
        if !requested.is_empty() {
            return requested;
        }
        let hinted = hinted_languages(jobs);
        if !hinted.is_empty() {
            return hinted;
        }
        self.default_languages.clone()
    }

    async fn render_scenes(
        &self,
        jobs: &[RenderJobDefinition],
    ) -> ShotplanResult<Vec<RenderResult>> {
        let gate = Arc::new(Semaphore::new(self.concurrency));
        let aborted = Arc::new(AtomicBool::new(false));
        let mut pending = FuturesUnordered::new();

        for (index, job) in jobs.iter().cloned().enumerate() {
            let gate = Arc::clone(&gate);
            let aborted = Arc::clone(&aborted);
            let renderer = Arc::clone(&self.renderer);
            let span = tracing::debug_span!("scene", job_id = %job.job_id, order = job.order);

            let task = tokio::spawn(run_scene(gate, aborted, renderer, job).instrument(span));
            pending.push(async move { (index, task.await) });
        }

        let mut slots = vec![None::<RenderResult>; jobs.len()];
        while let Some((index, joined)) = pending.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Err(ShotplanError::render(
                    &jobs[index].scene_id,
                    format!("render task failed: {e}"),
                ))
            });
            match outcome {
                Ok(Some(result)) => slots[index] = Some(result),
                Ok(None) => {}
                Err(e) => {
                    aborted.store(true, Ordering::Release);
                    let completed = slots
                        .iter()
                        .flatten()
                        .map(|r| r.scene_id.as_str())
                        .collect::<Vec<_>>();
                    tracing::warn!(
                        scene_id = %jobs[index].scene_id,
                        error = %e,
                        completed = ?completed,
                        "scene render failed; aborting plan"
                    );
                    return Err(e);
                }
            }
        }

        slots
            .into_iter()
            .zip(jobs)
            .map(|(slot, job)| {
                slot.ok_or_else(|| {
                    ShotplanError::render(&job.scene_id, "scene render was skipped")
                })
            })
            .collect()
    }
}

// The permit is held until this returns, on success and failure alike.
async fn run_scene(
    gate: Arc<Semaphore>,
    aborted: Arc<AtomicBool>,
    renderer: Arc<dyn SceneRenderer>,
    job: RenderJobDefinition,
) -> ShotplanResult<Option<RenderResult>> {
    let _permit = gate
        .acquire_owned()
        .await
        .map_err(|_| ShotplanError::render(&job.scene_id, "concurrency gate closed"))?;
    if aborted.load(Ordering::Acquire) {
        tracing::debug!("skipped after an earlier scene failed");
        return Ok(None);
    }

    tracing::debug!("dispatching scene render");
    match renderer.render(&job).await {
        Ok(result) => {
            tracing::debug!(path = %result.output_path.display(), "scene rendered");
            Ok(Some(result))
        }
        Err(e) => {
            aborted.store(true, Ordering::Release);
            Err(e)
        }
    }
}
