use std::path::{Path, PathBuf};

use crate::{
    error::ShotplanResult,
    model::{AudioTrackPlan, CaptionHint, OverlayPlan, ScenePlan, ShotPlan},
    presets::{BrandLookupTable, SafeZonePreset, resolve_brand_lut, resolve_safe_zone_preset},
};

/// One trimmed source clip inside a scene job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSegment {
    pub clip_id: String,
    pub source: String,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,
}

/// Fully resolved unit of work for one scene of one render call.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJobDefinition {
    pub job_id: String,
    pub scene_id: String,
    pub order: i32,
    pub safe_zone_preset: SafeZonePreset,
    pub brand_lut: BrandLookupTable,
    pub segments: Vec<RenderSegment>,
    pub overlays: Vec<OverlayPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTrackPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_hint: Option<CaptionHint>,
    pub output_path: PathBuf,
    pub estimated_duration: f64, // seconds
}

/// Stable `"{planId}:{sceneId}"` key for a scene job.
pub fn build_scene_job_id(plan: &ShotPlan, scene: &ScenePlan) -> String {
    format!("{}:{}", plan.id, scene.id)
}

/// Per-scene artifact path next to the plan output:
/// `out/final.mp4` + scene `hook` at order 2 becomes `out/final.scene2-hook.mp4`.
///
/// Unique per scene because scene orders are unique within a valid plan.
pub fn scene_output_path(plan: &ShotPlan, scene: &ScenePlan) -> PathBuf {
    let out = &plan.output_path;
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| sanitize(&plan.id));
    let ext = out
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    let name = format!("{stem}.scene{}-{}.{ext}", scene.order, sanitize(&scene.id));
    match out.parent() {
        Some(dir) if dir != Path::new("") => dir.join(name),
        _ => PathBuf::from(name),
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Decompose `plan` into one job per scene, in `plan.scenes` order.
///
/// Pure: the same plan always yields an equal job list. The safe-zone preset is shared by every
/// scene and an unknown preset id fails the whole decomposition.
#[tracing::instrument(skip(plan), fields(plan_id = %plan.id, scenes = plan.scenes.len()))]
pub fn derive_jobs(plan: &ShotPlan) -> ShotplanResult<Vec<RenderJobDefinition>> {
    let safe_zone_preset = resolve_safe_zone_preset(&plan.safe_zone_preset_id)?;
    let brand_lut = resolve_brand_lut(&plan.brand_id);

    let jobs = plan
        .scenes
        .iter()
        .map(|scene| RenderJobDefinition {
            job_id: build_scene_job_id(plan, scene),
            scene_id: scene.id.clone(),
            order: scene.order,
            safe_zone_preset: safe_zone_preset.clone(),
            brand_lut: brand_lut.clone(),
            segments: scene
                .shots
                .iter()
                .map(|shot| RenderSegment {
                    clip_id: shot.id.clone(),
                    source: shot.src.clone(),
                    duration: shot.duration,
                    trim_start: shot.start_offset,
                    trim_end: shot.trim_to,
                })
                .collect(),
            overlays: scene.overlays().to_vec(),
            audio: scene.audio.clone(),
            caption_hint: scene.caption_hints.clone(),
            output_path: scene_output_path(plan, scene),
            estimated_duration: scene.estimated_duration(),
        })
        .collect::<Vec<_>>();

    tracing::debug!(jobs = jobs.len(), "derived scene jobs");
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ShotplanError,
        model::{OverlayKind, ShotReference},
    };

    fn plan() -> ShotPlan {
        let shot = |id: &str, duration: f64, trim_to: Option<f64>| ShotReference {
            id: id.to_string(),
            src: format!("media/{id}.mp4"),
            duration,
            start_offset: Some(0.25),
            trim_to,
        };
        ShotPlan {
            id: "promo".to_string(),
            brand_id: "sunset".to_string(),
            safe_zone_preset_id: "square-1x1".to_string(),
            output_path: PathBuf::from("renders/promo.mov"),
            scenes: vec![
                ScenePlan {
                    id: "cta card".to_string(),
                    order: 1,
                    shots: vec![shot("c", 2.0, None)],
                    audio: None,
                    overlays: Some(vec![OverlayPlan {
                        kind: OverlayKind::Cta,
                        src: "cta.png".to_string(),
                        start: None,
                        end: None,
                        safe_zone: None,
                    }]),
                    caption_hints: None,
                },
                ScenePlan {
                    id: "hook".to_string(),
                    order: 0,
                    shots: vec![shot("a", 3.0, Some(2.25)), shot("b", 1.0, None)],
                    audio: None,
                    overlays: None,
                    caption_hints: None,
                },
            ],
            metadata: None,
        }
    }

    #[test]
    fn jobs_follow_array_order_and_carry_scene_order() {
        let jobs = derive_jobs(&plan()).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, "promo:cta card");
        assert_eq!(jobs[0].order, 1);
        assert_eq!(jobs[1].job_id, "promo:hook");
        assert_eq!(jobs[1].order, 0);
        assert_eq!(jobs[0].overlays.len(), 1);
        assert!(jobs[1].overlays.is_empty());
        assert_eq!(jobs[0].brand_lut.id, "sunset");
        assert_eq!(jobs[1].safe_zone_preset.id, "square-1x1");
    }

    #[test]
    fn segments_carry_trim_bounds() {
        let jobs = derive_jobs(&plan()).unwrap();
        let seg = &jobs[1].segments[0];
        assert_eq!(seg.clip_id, "a");
        assert_eq!(seg.source, "media/a.mp4");
        assert_eq!(seg.trim_start, Some(0.25));
        assert_eq!(seg.trim_end, Some(2.25));
        assert_eq!(jobs[1].estimated_duration, 2.0 + 0.75);
    }

    #[test]
    fn scene_paths_are_unique_and_keep_extension() {
        let jobs = derive_jobs(&plan()).unwrap();
        assert_eq!(
            jobs[0].output_path,
            PathBuf::from("renders/promo.scene1-cta_card.mov")
        );
        assert_eq!(
            jobs[1].output_path,
            PathBuf::from("renders/promo.scene0-hook.mov")
        );
    }

    #[test]
    fn bare_output_name_stays_relative() {
        let mut p = plan();
        p.output_path = PathBuf::from("final");
        let jobs = derive_jobs(&p).unwrap();
        assert_eq!(jobs[1].output_path, PathBuf::from("final.scene0-hook.mp4"));
    }

    #[test]
    fn unknown_preset_fails_decomposition() {
        let mut p = plan();
        p.safe_zone_preset_id = "cinemascope".to_string();
        assert!(matches!(
            derive_jobs(&p),
            Err(ShotplanError::UnknownPreset { .. })
        ));
    }
}
