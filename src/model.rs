use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use crate::{
    error::{ShotplanError, ShotplanResult},
    lineage::LineageEntry,
};

/// Immutable declarative description of a full video render.
///
/// `scenes` order is significant only for job decomposition; the final artifact is assembled in
/// ascending [`ScenePlan::order`]. Edits never touch a plan in place: see
/// [`apply_mutation`](crate::apply_mutation) and [`append_lineage`](crate::append_lineage).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotPlan {
    pub id: String,
    pub brand_id: String,
    pub safe_zone_preset_id: String,
    pub output_path: PathBuf,
    pub scenes: Vec<ScenePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PlanMetadata>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePlan {
    pub id: String,
    pub order: i32,
    pub shots: Vec<ShotReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTrackPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlays: Option<Vec<OverlayPlan>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_hints: Option<CaptionHint>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotReference {
    pub id: String,
    pub src: String,
    pub duration: f64, // seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_to: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPlan {
    #[serde(rename = "type")]
    pub kind: OverlayKind,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_zone: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayKind {
    Logo,
    LowerThird,
    Cta,
    Slug,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrackPlan {
    #[serde(rename = "type")]
    pub kind: AudioKind,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioKind {
    Voiceover,
    Music,
    Dialog,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_languages: Vec<String>,
}

impl CaptionHint {
    /// Default language first, then additional languages, without duplicates.
    pub fn languages(&self) -> Vec<String> {
        let mut out = Vec::new();
        for lang in self
            .default_language
            .iter()
            .chain(self.additional_languages.iter())
        {
            let lang = lang.trim();
            if !lang.is_empty() && !out.iter().any(|l: &String| l == lang) {
                out.push(lang.to_string());
            }
        }
        out
    }
}

/// Derivation history carried by a plan.
///
/// `extra` keeps any other metadata keys the producer attached so they survive a round-trip.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lineage",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub lineage: Vec<LineageEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// A lineage value that is not an array (or whose entries are malformed) reads as empty history.
fn deserialize_lineage<'de, D>(de: D) -> Result<Vec<LineageEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = <serde_json::Value as serde::Deserialize>::deserialize(de)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

impl ShotPlan {
    pub fn validate(&self) -> ShotplanResult<()> {
        if self.id.trim().is_empty() {
            return Err(ShotplanError::validation("plan id must be non-empty"));
        }
        if self.scenes.is_empty() {
            return Err(ShotplanError::validation(format!(
                "plan '{}' has no scenes",
                self.id
            )));
        }

        let mut scene_ids = BTreeSet::new();
        let mut orders = BTreeSet::new();
        for scene in &self.scenes {
            if !scene_ids.insert(scene.id.as_str()) {
                return Err(ShotplanError::validation(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
            if !orders.insert(scene.order) {
                return Err(ShotplanError::validation(format!(
                    "scene '{}' reuses order {}",
                    scene.id, scene.order
                )));
            }
            scene.validate()?;
        }

        Ok(())
    }

    pub fn scene(&self, scene_id: &str) -> Option<&ScenePlan> {
        self.scenes.iter().find(|s| s.id == scene_id)
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.metadata.as_ref()?.parent_id.as_deref()
    }

    pub fn lineage(&self) -> &[LineageEntry] {
        self.metadata
            .as_ref()
            .map(|m| m.lineage.as_slice())
            .unwrap_or(&[])
    }

    /// Sum of all scenes' estimated durations, in seconds.
    pub fn estimated_duration(&self) -> f64 {
        self.scenes.iter().map(ScenePlan::estimated_duration).sum()
    }
}

impl ScenePlan {
    pub fn validate(&self) -> ShotplanResult<()> {
        if self.shots.is_empty() {
            return Err(ShotplanError::validation(format!(
                "scene '{}' has no shots",
                self.id
            )));
        }
        for shot in &self.shots {
            shot.validate().map_err(|e| match e {
                ShotplanError::Validation(msg) => {
                    ShotplanError::validation(format!("scene '{}': {msg}", self.id))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn overlays(&self) -> &[OverlayPlan] {
        self.overlays.as_deref().unwrap_or(&[])
    }

    pub fn estimated_duration(&self) -> f64 {
        self.shots.iter().map(ShotReference::effective_duration).sum()
    }
}

impl ShotReference {
    pub fn validate(&self) -> ShotplanResult<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ShotplanError::validation(format!(
                "shot '{}' duration must be finite and > 0",
                self.id
            )));
        }
        let start = self.start_offset.unwrap_or(0.0);
        if !start.is_finite() || start < 0.0 {
            return Err(ShotplanError::validation(format!(
                "shot '{}' startOffset must be finite and >= 0",
                self.id
            )));
        }
        if let Some(end) = self.trim_to
            && (!end.is_finite() || end <= start)
        {
            return Err(ShotplanError::validation(format!(
                "shot '{}' trimTo must be greater than startOffset",
                self.id
            )));
        }
        Ok(())
    }

    /// Seconds of source actually used once trim bounds are applied. Never negative.
    pub fn effective_duration(&self) -> f64 {
        let start = self.start_offset.unwrap_or(0.0);
        let end = self.trim_to.unwrap_or(self.duration).min(self.duration);
        (end - start).max(0.0)
    }
}
