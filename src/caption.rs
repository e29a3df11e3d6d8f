use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    config::CaptionConfig,
    error::{ShotplanError, ShotplanResult},
    jobs::RenderJobDefinition,
    render::RenderResult,
};

/// Everything a caption pass needs: the stitched video plus each scene's job and result so text
/// can be aligned to scene timings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    pub plan_id: String,
    pub final_video_path: PathBuf,
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub scene_jobs: Vec<RenderJobDefinition>,
    pub render_results: Vec<RenderResult>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionBundle {
    pub language: String,
    pub srt_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vtt_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burned_in_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionOrchestrationResult {
    pub bundles: Vec<CaptionBundle>,
}

#[async_trait::async_trait]
pub trait CaptionManager: Send + Sync {
    async fn orchestrate(&self, request: &CaptionRequest)
    -> ShotplanResult<CaptionOrchestrationResult>;
}

/// One timed caption line.
#[derive(Clone, Debug, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Cues in scene order, timed by the cumulative duration of the rendered scenes.
///
/// A scene contributes a cue when its caption hint has a prompt, or when `fallback_prompt` is
/// set; silent scenes still advance the clock.
pub fn build_cues(
    jobs: &[RenderJobDefinition],
    results: &[RenderResult],
    fallback_prompt: Option<&str>,
) -> Vec<Cue> {
    let mut ordered = results.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|r| r.order);

    let mut cues = Vec::new();
    let mut clock = 0.0f64;
    for result in ordered {
        let start = clock;
        clock += result.duration.max(0.0);

        let scene_prompt = jobs
            .iter()
            .find(|j| j.job_id == result.job_id)
            .and_then(|j| j.caption_hint.as_ref())
            .and_then(|h| h.prompt.as_deref());
        let Some(text) = scene_prompt.or(fallback_prompt) else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() || clock <= start {
            continue;
        }
        cues.push(Cue {
            start,
            end: clock,
            text: text.to_string(),
        });
    }
    cues
}

/// Languages to caption when the request names none: scene hint languages in scene order.
pub fn hinted_languages(jobs: &[RenderJobDefinition]) -> Vec<String> {
    let mut ordered = jobs.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|j| j.order);

    let mut out = Vec::<String>::new();
    for hint in ordered.into_iter().filter_map(|j| j.caption_hint.as_ref()) {
        for lang in hint.languages() {
            if !out.contains(&lang) {
                out.push(lang);
            }
        }
    }
    out
}

pub fn format_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            timestamp(cue.start, ','),
            timestamp(cue.end, ','),
            cue.text
        ));
    }
    out
}

pub fn format_vtt(cues: &[Cue]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for cue in cues {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            timestamp(cue.start, '.'),
            timestamp(cue.end, '.'),
            cue.text
        ));
    }
    out
}

fn timestamp(seconds: f64, ms_sep: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let h = total_ms / 3_600_000;
    let m = (total_ms / 60_000) % 60;
    let s = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;
    format!("{h:02}:{m:02}:{s:02}{ms_sep}{ms:03}")
}

/// Writes SRT (and optionally WebVTT) sidecar files next to the stitched video.
///
/// No translation or burn-in happens here: every language receives the plan's own caption text
/// and `burned_in_path` stays `None`.
#[derive(Clone, Debug, Default)]
pub struct SidecarCaptionManager {
    config: CaptionConfig,
}

impl SidecarCaptionManager {
    pub fn new(config: CaptionConfig) -> Self {
        Self { config }
    }

    fn sidecar_path(&self, video: &Path, language: &str, ext: &str) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "captions".to_string());
        let name = format!("{stem}.{}.{ext}", language_tag(language));
        match (&self.config.out_dir, video.parent()) {
            (Some(dir), _) => dir.join(name),
            (None, Some(parent)) => parent.join(name),
            (None, None) => PathBuf::from(name),
        }
    }
}

/// The part of a language code that goes into a sidecar file name.
fn language_tag(language: &str) -> String {
    language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Drops repeated languages and rejects any whose file tag is empty or shared with another.
fn distinct_sidecar_languages(languages: Vec<String>) -> ShotplanResult<Vec<String>> {
    let mut seen = BTreeMap::<String, String>::new();
    let mut out = Vec::with_capacity(languages.len());
    for language in languages {
        let tag = language_tag(&language);
        if tag.is_empty() {
            return Err(ShotplanError::caption(format!(
                "caption language '{language}' has no usable file name tag"
            )));
        }
        match seen.get(&tag) {
            Some(prev) if *prev == language => continue,
            Some(prev) => {
                return Err(ShotplanError::caption(format!(
                    "caption languages '{prev}' and '{language}' both map to '{tag}'"
                )));
            }
            None => {
                seen.insert(tag, language.clone());
                out.push(language);
            }
        }
    }
    Ok(out)
}

#[async_trait::async_trait]
impl CaptionManager for SidecarCaptionManager {
    #[tracing::instrument(skip(self, request), fields(plan_id = %request.plan_id))]
    async fn orchestrate(
        &self,
        request: &CaptionRequest,
    ) -> ShotplanResult<CaptionOrchestrationResult> {
        let mut languages = request.languages.clone();
        if languages.is_empty() {
            languages = hinted_languages(&request.scene_jobs);
        }
        if languages.is_empty() {
            return Err(ShotplanError::caption("no caption languages requested"));
        }
        let languages = distinct_sidecar_languages(languages)?;

        let cues = build_cues(
            &request.scene_jobs,
            &request.render_results,
            request.prompt.as_deref(),
        );
        let srt = format_srt(&cues);
        let vtt = format_vtt(&cues);

        let mut bundles = Vec::with_capacity(languages.len());
        for language in languages {
            let srt_path = self.sidecar_path(&request.final_video_path, &language, "srt");
            write_text(&srt_path, &srt).await?;

            let vtt_path = if self.config.write_vtt {
                let path = self.sidecar_path(&request.final_video_path, &language, "vtt");
                write_text(&path, &vtt).await?;
                Some(path)
            } else {
                None
            };

            tracing::debug!(
                %language,
                cues = cues.len(),
                srt = %srt_path.display(),
                "wrote captions"
            );
            bundles.push(CaptionBundle {
                language,
                srt_path,
                vtt_path,
                burned_in_path: None,
            });
        }

        Ok(CaptionOrchestrationResult { bundles })
    }
}

async fn write_text(path: &Path, contents: &str) -> ShotplanResult<()> {
    if let Some(parent) = path.parent()
        && parent != Path::new("")
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create caption directory '{}'", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write captions '{}'", path.display()))?;
    Ok(())
}
