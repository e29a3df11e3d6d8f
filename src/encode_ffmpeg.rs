use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::Context as _;
use tokio::{process::Command, sync::OnceCell};

use crate::{
    config::FfmpegConfig,
    error::{ShotplanError, ShotplanResult},
    jobs::RenderJobDefinition,
    model::{OverlayKind, OverlayPlan},
    render::{RenderResult, SceneRenderer},
};

const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// [`SceneRenderer`] backed by the system `ffmpeg` binary.
///
/// Each scene is one ffmpeg invocation: trim + conform every segment to the safe-zone canvas,
/// concatenate, grade with the brand LUT, composite overlays inside the safe zone and mux the
/// scene audio, or silence when the scene has none. Stitching uses the concat demuxer with
/// stream copy, so every scene must share codec settings and stream layout (they do when
/// rendered by the same instance).
#[derive(Debug)]
pub struct FfmpegRenderer {
    cfg: FfmpegConfig,
    available: OnceCell<bool>,
}

impl FfmpegRenderer {
    pub fn new(cfg: FfmpegConfig) -> ShotplanResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            available: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &FfmpegConfig {
        &self.cfg
    }

    async fn ensure_available(&self) -> Result<(), String> {
        let ok = *self
            .available
            .get_or_init(|| is_ffmpeg_available(&self.cfg.binary))
            .await;
        if ok {
            Ok(())
        } else {
            Err(format!(
                "ffmpeg is required for rendering, but '{}' could not be run",
                self.cfg.binary.display()
            ))
        }
    }

    async fn run(&self, args: &[String]) -> Result<(), String> {
        tracing::trace!(binary = %self.cfg.binary.display(), ?args, "spawning ffmpeg");
        let output = Command::new(&self.cfg.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .output()
            .await
            .map_err(|e| format!("failed to spawn ffmpeg (is it installed and on PATH?): {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        Ok(())
    }

    fn concat_list_path(&self, output: &Path) -> PathBuf {
        let dir = self
            .cfg
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stitch".to_string());
        dir.join(format!(
            "shotplan_concat_{stem}_{}_{}.txt",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ))
    }
}

#[async_trait::async_trait]
impl SceneRenderer for FfmpegRenderer {
    #[tracing::instrument(skip(self, job), fields(job_id = %job.job_id))]
    async fn render(&self, job: &RenderJobDefinition) -> ShotplanResult<RenderResult> {
        self.ensure_available()
            .await
            .map_err(|e| ShotplanError::render(&job.scene_id, e))?;
        ensure_parent_dir(&job.output_path).await?;

        let args = scene_render_args(job, &self.cfg)?;
        self.run(&args)
            .await
            .map_err(|e| ShotplanError::render(&job.scene_id, e))?;

        Ok(RenderResult::for_job(job))
    }

    #[tracing::instrument(skip(self, results), fields(scenes = results.len()))]
    async fn stitch(
        &self,
        results: &[RenderResult],
        output_path: &Path,
    ) -> ShotplanResult<PathBuf> {
        if results.is_empty() {
            return Err(ShotplanError::stitch("nothing to stitch"));
        }
        self.ensure_available().await.map_err(ShotplanError::stitch)?;
        ensure_parent_dir(output_path).await?;

        let list_path = self.concat_list_path(output_path);
        ensure_parent_dir(&list_path).await?;
        tokio::fs::write(&list_path, concat_list(results)?)
            .await
            .with_context(|| format!("failed to write concat list '{}'", list_path.display()))?;
        let _guard = TempFileGuard(Some(list_path.clone()));

        let args = stitch_args(&list_path, output_path, &self.cfg);
        self.run(&args).await.map_err(ShotplanError::stitch)?;
        Ok(output_path.to_path_buf())
    }
}

pub async fn is_ffmpeg_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

pub async fn ensure_parent_dir(path: &Path) -> ShotplanResult<()> {
    if let Some(parent) = path.parent()
        && parent != Path::new("")
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Full ffmpeg argument list (without the binary) for one scene job.
pub fn scene_render_args(
    job: &RenderJobDefinition,
    cfg: &FfmpegConfig,
) -> ShotplanResult<Vec<String>> {
    if job.segments.is_empty() {
        return Err(ShotplanError::render(&job.scene_id, "scene has no segments"));
    }
    let zone = &job.safe_zone_preset;
    if !zone.width.is_multiple_of(2) || !zone.height.is_multiple_of(2) {
        // yuv420p output needs even dimensions.
        return Err(ShotplanError::render(
            &job.scene_id,
            format!("safe-zone canvas {}x{} must be even", zone.width, zone.height),
        ));
    }

    let mut args = vec![
        if cfg.overwrite { "-y" } else { "-n" }.to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];
    for seg in &job.segments {
        args.push("-i".to_string());
        args.push(seg.source.clone());
    }
    let overlay_base = job.segments.len();
    for overlay in &job.overlays {
        args.push("-i".to_string());
        args.push(overlay.src.clone());
    }
    // Scenes without a track get silence so every scene file has the same stream layout.
    let audio_index = overlay_base + job.overlays.len();
    match &job.audio {
        Some(audio) => args.extend(["-i".to_string(), audio.src.clone()]),
        None => args.extend([
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("anullsrc=channel_layout=stereo:sample_rate={AUDIO_SAMPLE_RATE}"),
        ]),
    }

    let mut filters = Vec::<String>::new();
    let mut video_len = 0.0f64;
    for (i, seg) in job.segments.iter().enumerate() {
        let start = seg.trim_start.unwrap_or(0.0);
        let end = seg.trim_end.unwrap_or(seg.duration).min(seg.duration);
        if end <= start {
            return Err(ShotplanError::render(
                &job.scene_id,
                format!("segment '{}' is empty after trimming", seg.clip_id),
            ));
        }
        video_len += end - start;
        filters.push(format!(
            "[{i}:v]trim=start={start:.3}:end={end:.3},setpts=PTS-STARTPTS,\
             scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}[v{i}]",
            w = zone.width,
            h = zone.height,
            fps = cfg.fps,
        ));
    }

    let inputs = (0..job.segments.len())
        .map(|i| format!("[v{i}]"))
        .collect::<String>();
    filters.push(format!(
        "{inputs}concat=n={}:v=1:a=0[base]",
        job.segments.len()
    ));

    let mut current = "base".to_string();
    if let Some(lut) = &job.brand_lut.lut_path {
        let file = escape_filter_value(lut);
        let intensity = job.brand_lut.intensity.clamp(0.0, 1.0);
        if intensity >= 1.0 {
            filters.push(format!("[{current}]lut3d=file='{file}'[graded]"));
        } else {
            filters.push(format!(
                "[{current}]split[raw][tograde];[tograde]lut3d=file='{file}'[lut];\
                 [raw][lut]blend=all_mode=normal:all_opacity={intensity:.3}[graded]"
            ));
        }
        current = "graded".to_string();
    }

    for (k, overlay) in job.overlays.iter().enumerate() {
        let (x, y) = overlay_position(overlay.kind, zone.content_box());
        let enable = overlay_enable(overlay);
        let next = format!("ov{k}");
        filters.push(format!(
            "[{current}][{}:v]overlay=x={x}:y={y}{enable}[{next}]",
            overlay_base + k
        ));
        current = next;
    }

    // Audio is padded and cut to the video length; it never shortens the scene.
    let gain = match &job.audio {
        Some(audio) => format!("volume={:.3},", audio.gain.unwrap_or(1.0).max(0.0)),
        None => String::new(),
    };
    filters.push(format!(
        "[{audio_index}:a]{gain}aformat=sample_rates={AUDIO_SAMPLE_RATE}:channel_layouts=stereo,\
         apad,atrim=end={video_len:.3},asetpts=PTS-STARTPTS[aout]"
    ));
    let maps = [
        "-map".to_string(),
        format!("[{current}]"),
        "-map".to_string(),
        "[aout]".to_string(),
    ];

    args.push("-filter_complex".to_string());
    args.push(filters.join(";"));
    args.extend(maps);

    args.extend([
        "-c:v".to_string(),
        cfg.video_codec.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-r".to_string(),
        cfg.fps.to_string(),
    ]);
    args.extend([
        "-c:a".to_string(),
        cfg.audio_codec.clone(),
        "-ar".to_string(),
        AUDIO_SAMPLE_RATE.to_string(),
    ]);
    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    args.push(job.output_path.to_string_lossy().into_owned());
    Ok(args)
}

/// Concat-demuxer input listing `results` in the given order.
///
/// Entries are absolute: the demuxer resolves relative entries against the list file's
/// directory, which is not the working directory the scenes were rendered from.
pub fn concat_list(results: &[RenderResult]) -> ShotplanResult<String> {
    let mut out = String::new();
    for r in results {
        let abs = std::path::absolute(&r.output_path).with_context(|| {
            format!("failed to resolve scene output '{}'", r.output_path.display())
        })?;
        let path = abs.to_string_lossy().replace('\'', r"'\''");
        out.push_str(&format!("file '{path}'\n"));
    }
    Ok(out)
}

pub fn stitch_args(list_path: &Path, output_path: &Path, cfg: &FfmpegConfig) -> Vec<String> {
    vec![
        if cfg.overwrite { "-y" } else { "-n" }.to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output_path.to_string_lossy().into_owned(),
    ]
}

// `w`/`h` in the expressions are the overlay's own size.
fn overlay_position(kind: OverlayKind, content: (u32, u32, u32, u32)) -> (String, String) {
    let (cx, cy, cw, ch) = content;
    match kind {
        OverlayKind::Logo => (cx.to_string(), cy.to_string()),
        OverlayKind::Slug => (format!("{}-w", cx + cw), cy.to_string()),
        OverlayKind::LowerThird => (cx.to_string(), format!("{}-h", cy + ch)),
        OverlayKind::Cta => (format!("{cx}+({cw}-w)/2"), format!("{}-h", cy + ch)),
    }
}

fn overlay_enable(overlay: &OverlayPlan) -> String {
    match (overlay.start, overlay.end) {
        (None, None) => String::new(),
        (Some(s), None) => format!(":enable='gte(t,{s:.3})'"),
        (None, Some(e)) => format!(":enable='lte(t,{e:.3})'"),
        (Some(s), Some(e)) => format!(":enable='between(t,{s:.3},{e:.3})'"),
    }
}

fn escape_filter_value(v: &str) -> String {
    v.replace('\\', r"\\").replace(':', r"\:").replace('\'', r"\'")
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
