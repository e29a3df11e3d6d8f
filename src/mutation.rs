use crate::{
    error::{ShotplanError, ShotplanResult},
    model::{CaptionHint, OverlayKind, ScenePlan, ShotPlan, ShotReference},
};

/// A scene-addressed edit. Closed set: adding a variant is a compile error in
/// [`apply_mutation_with`] until it is handled there.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mutation {
    #[serde(rename_all = "camelCase")]
    Trim {
        scene_id: String,
        shot_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trim_start: Option<f64>,
        trim_end: f64,
    },
    #[serde(rename_all = "camelCase")]
    HookRewrite { scene_id: String, text: String },
    #[serde(rename_all = "camelCase")]
    CtaSwap { scene_id: String, asset: String },
}

impl Mutation {
    pub fn scene_id(&self) -> &str {
        match self {
            Mutation::Trim { scene_id, .. }
            | Mutation::HookRewrite { scene_id, .. }
            | Mutation::CtaSwap { scene_id, .. } => scene_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Trim { .. } => "trim",
            Mutation::HookRewrite { .. } => "hook_rewrite",
            Mutation::CtaSwap { .. } => "cta_swap",
        }
    }
}

/// What to do when a mutation names a scene (or shot) the plan does not have.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressPolicy {
    /// Return the plan unchanged.
    #[default]
    Lenient,
    /// Fail with [`ShotplanError::AddressNotFound`].
    Strict,
}

/// Derive a new plan from `parent` by applying `mutation` to its target scene.
///
/// Total: an unknown scene or shot id yields a plan whose scenes equal `parent.scenes`. The
/// result keeps `parent.id`; assigning a child id is the caller's job (see
/// [`derive_child_plan`](crate::derive_child_plan)).
pub fn apply_mutation(parent: &ShotPlan, mutation: &Mutation) -> ShotPlan {
    match apply_mutation_with(parent, mutation, AddressPolicy::Lenient) {
        Ok(plan) => plan,
        // Lenient application never reports a missing address.
        Err(_) => parent.clone(),
    }
}

#[tracing::instrument(skip(parent, mutation), fields(plan_id = %parent.id, kind = mutation.kind()))]
pub fn apply_mutation_with(
    parent: &ShotPlan,
    mutation: &Mutation,
    policy: AddressPolicy,
) -> ShotplanResult<ShotPlan> {
    let scene_id = mutation.scene_id();
    let mut scene_found = false;
    let mut applied = false;

    let scenes = parent
        .scenes
        .iter()
        .map(|scene| {
            if scene.id != scene_id {
                return scene.clone();
            }
            scene_found = true;
            match apply_to_scene(scene, mutation) {
                Some(next) => {
                    applied = true;
                    next
                }
                None => scene.clone(),
            }
        })
        .collect::<Vec<_>>();

    if !applied {
        let what = if scene_found {
            match mutation {
                Mutation::Trim { shot_id, .. } => {
                    format!("shot '{shot_id}' in scene '{scene_id}' of plan '{}'", parent.id)
                }
                _ => format!("scene '{scene_id}' of plan '{}'", parent.id),
            }
        } else {
            format!("scene '{scene_id}' in plan '{}'", parent.id)
        };
        match policy {
            AddressPolicy::Strict => return Err(ShotplanError::address_not_found(what)),
            AddressPolicy::Lenient => {
                tracing::warn!(target_addr = %what, "mutation matched nothing; plan unchanged");
            }
        }
    }

    Ok(ShotPlan {
        scenes,
        ..parent.clone()
    })
}

// `None` means the mutation addressed something inside the scene that does not exist.
fn apply_to_scene(scene: &ScenePlan, mutation: &Mutation) -> Option<ScenePlan> {
    match mutation {
        Mutation::Trim {
            shot_id,
            trim_start,
            trim_end,
            ..
        } => {
            if !scene.shots.iter().any(|s| &s.id == shot_id) {
                return None;
            }
            let shots = scene
                .shots
                .iter()
                .map(|shot| {
                    if &shot.id != shot_id {
                        return shot.clone();
                    }
                    ShotReference {
                        start_offset: trim_start.or(shot.start_offset),
                        trim_to: Some(*trim_end),
                        ..shot.clone()
                    }
                })
                .collect();
            Some(ScenePlan {
                shots,
                ..scene.clone()
            })
        }
        Mutation::HookRewrite { text, .. } => {
            let previous = scene.caption_hints.clone().unwrap_or_default();
            Some(ScenePlan {
                caption_hints: Some(CaptionHint {
                    prompt: Some(text.clone()),
                    default_language: previous
                        .default_language
                        .or_else(|| Some("en".to_string())),
                    additional_languages: previous.additional_languages,
                }),
                ..scene.clone()
            })
        }
        Mutation::CtaSwap { asset, .. } => {
            let overlays = scene.overlays.as_ref().map(|overlays| {
                overlays
                    .iter()
                    .map(|overlay| {
                        let mut next = overlay.clone();
                        if overlay.kind == OverlayKind::Cta {
                            next.src = asset.clone();
                        }
                        next
                    })
                    .collect()
            });
            Some(ScenePlan {
                overlays,
                ..scene.clone()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::model::OverlayPlan;

    fn plan() -> ShotPlan {
        ShotPlan {
            id: "p0".to_string(),
            brand_id: "default".to_string(),
            safe_zone_preset_id: "vertical-9x16".to_string(),
            output_path: PathBuf::from("out/p0.mp4"),
            scenes: vec![ScenePlan {
                id: "s0".to_string(),
                order: 0,
                shots: vec![
                    ShotReference {
                        id: "a".to_string(),
                        src: "a.mp4".to_string(),
                        duration: 6.0,
                        start_offset: Some(0.5),
                        trim_to: None,
                    },
                    ShotReference {
                        id: "b".to_string(),
                        src: "b.mp4".to_string(),
                        duration: 4.0,
                        start_offset: None,
                        trim_to: None,
                    },
                ],
                audio: None,
                overlays: Some(vec![OverlayPlan {
                    kind: OverlayKind::Cta,
                    src: "old.png".to_string(),
                    start: None,
                    end: None,
                    safe_zone: None,
                }]),
                caption_hints: Some(CaptionHint {
                    prompt: Some("old hook".to_string()),
                    default_language: None,
                    additional_languages: vec!["rw".to_string()],
                }),
            }],
            metadata: None,
        }
    }

    #[test]
    fn trim_rewrites_only_the_named_shot() {
        let p = plan();
        let out = apply_mutation(
            &p,
            &Mutation::Trim {
                scene_id: "s0".to_string(),
                shot_id: "a".to_string(),
                trim_start: None,
                trim_end: 2.5,
            },
        );
        let shots = &out.scenes[0].shots;
        assert_eq!(shots[0].start_offset, Some(0.5));
        assert_eq!(shots[0].trim_to, Some(2.5));
        assert_eq!(shots[1], p.scenes[0].shots[1]);
    }

    #[test]
    fn trim_with_unknown_shot_is_a_noop() {
        let p = plan();
        let m = Mutation::Trim {
            scene_id: "s0".to_string(),
            shot_id: "zz".to_string(),
            trim_start: Some(1.0),
            trim_end: 2.0,
        };
        assert_eq!(apply_mutation(&p, &m), p);
        let err = apply_mutation_with(&p, &m, AddressPolicy::Strict).unwrap_err();
        assert!(matches!(err, ShotplanError::AddressNotFound(_)));
        assert!(err.to_string().contains("shot 'zz'"));
    }

    #[test]
    fn hook_rewrite_defaults_language_and_keeps_extras() {
        let out = apply_mutation(
            &plan(),
            &Mutation::HookRewrite {
                scene_id: "s0".to_string(),
                text: "new hook".to_string(),
            },
        );
        let hints = out.scenes[0].caption_hints.as_ref().unwrap();
        assert_eq!(hints.prompt.as_deref(), Some("new hook"));
        assert_eq!(hints.default_language.as_deref(), Some("en"));
        assert_eq!(hints.additional_languages, vec!["rw".to_string()]);
    }

    #[test]
    fn hook_rewrite_keeps_existing_default_language() {
        let mut p = plan();
        p.scenes[0].caption_hints = Some(CaptionHint {
            prompt: None,
            default_language: Some("fr".to_string()),
            additional_languages: vec![],
        });
        let out = apply_mutation(
            &p,
            &Mutation::HookRewrite {
                scene_id: "s0".to_string(),
                text: "salut".to_string(),
            },
        );
        let hints = out.scenes[0].caption_hints.as_ref().unwrap();
        assert_eq!(hints.default_language.as_deref(), Some("fr"));
    }

    #[test]
    fn cta_swap_on_scene_without_overlays_leaves_none() {
        let mut p = plan();
        p.scenes[0].overlays = None;
        let out = apply_mutation(
            &p,
            &Mutation::CtaSwap {
                scene_id: "s0".to_string(),
                asset: "new.png".to_string(),
            },
        );
        assert!(out.scenes[0].overlays.is_none());
    }

    #[test]
    fn strict_unknown_scene_names_the_scene() {
        let err = apply_mutation_with(
            &plan(),
            &Mutation::CtaSwap {
                scene_id: "nope".to_string(),
                asset: "x.png".to_string(),
            },
            AddressPolicy::Strict,
        )
        .unwrap_err();
        assert!(err.to_string().contains("scene 'nope' in plan 'p0'"));
    }

    #[test]
    fn mutation_json_uses_type_tag_and_camel_case() {
        let m: Mutation = serde_json::from_value(serde_json::json!({
            "type": "trim",
            "sceneId": "s0",
            "shotId": "a",
            "trimEnd": 3
        }))
        .unwrap();
        assert_eq!(
            m,
            Mutation::Trim {
                scene_id: "s0".to_string(),
                shot_id: "a".to_string(),
                trim_start: None,
                trim_end: 3.0,
            }
        );
        assert_eq!(m.kind(), "trim");
        let v = serde_json::to_value(Mutation::CtaSwap {
            scene_id: "s1".to_string(),
            asset: "cta.png".to_string(),
        })
        .unwrap();
        assert_eq!(v, serde_json::json!({"type": "cta_swap", "sceneId": "s1", "asset": "cta.png"}));
    }
}
