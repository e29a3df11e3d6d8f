//! Shotplan models a short-form video as an immutable [`ShotPlan`] and renders it.
//!
//! - Edit a plan with [`apply_mutation`] and record the edit with [`append_lineage`]
//! - Turn a plan into per-scene [`RenderJobDefinition`]s with [`derive_jobs`]
//! - Render, stitch and caption a plan with an [`Orchestrator`] over pluggable
//!   [`SceneRenderer`] and [`CaptionManager`] capabilities
#![forbid(unsafe_code)]

mod foundation;

pub mod caption;
pub mod config;
pub mod edit;
pub mod encode_ffmpeg;
pub mod fingerprint;
pub mod jobs;
pub mod lineage;
pub mod model;
pub mod mutation;
pub mod orchestrator;
pub mod presets;
pub mod render;

pub use crate::foundation::error;

pub use caption::{
    CaptionBundle, CaptionManager, CaptionOrchestrationResult, CaptionRequest,
    SidecarCaptionManager,
};
pub use config::{CaptionConfig, FfmpegConfig, OrchestratorConfig};
pub use edit::{EditOutcome, EditRequest, derive_child_plan, process_edit};
pub use encode_ffmpeg::{FfmpegRenderer, is_ffmpeg_available};
pub use error::{ShotplanError, ShotplanResult};
pub use fingerprint::{JobFingerprint, fingerprint_job, fingerprint_jobs};
pub use jobs::{RenderJobDefinition, RenderSegment, build_scene_job_id, derive_jobs};
pub use lineage::{LineageEntry, append_lineage};
pub use model::{
    AudioKind, AudioTrackPlan, CaptionHint, OverlayKind, OverlayPlan, PlanMetadata, ScenePlan,
    ShotPlan, ShotReference,
};
pub use mutation::{AddressPolicy, Mutation, apply_mutation, apply_mutation_with};
pub use orchestrator::{Orchestrator, RenderInputs, RenderOptions, RenderPlanOutcome};
pub use presets::{BrandLookupTable, SafeZonePreset, resolve_brand_lut, resolve_safe_zone_preset};
pub use render::{RenderResult, SceneRenderer};
