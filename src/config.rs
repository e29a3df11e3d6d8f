use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    error::{ShotplanError, ShotplanResult},
    mutation::AddressPolicy,
};

pub const DEFAULT_CONCURRENCY: usize = 3;

pub const ENV_CONCURRENCY: &str = "SHOTPLAN_CONCURRENCY";
pub const ENV_FFMPEG: &str = "SHOTPLAN_FFMPEG";

/// Settings for an [`Orchestrator`](crate::Orchestrator) and the default capabilities.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Maximum scene renders in flight per render call.
    pub concurrency: usize,
    pub address_policy: AddressPolicy,
    /// Used when a render call names no caption languages.
    pub default_languages: Vec<String>,
    pub ffmpeg: FfmpegConfig,
    pub captions: CaptionConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            address_policy: AddressPolicy::default(),
            default_languages: vec!["en".to_string()],
            ffmpeg: FfmpegConfig::default(),
            captions: CaptionConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FfmpegConfig {
    pub binary: PathBuf,
    /// Scratch directory for concat lists. Defaults to the system temp dir.
    pub work_dir: Option<PathBuf>,
    pub video_codec: String,
    pub audio_codec: String,
    pub fps: u32,
    pub overwrite: bool,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            work_dir: None,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            fps: 30,
            overwrite: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CaptionConfig {
    /// Directory for sidecar files. `None` writes next to the stitched video.
    pub out_dir: Option<PathBuf>,
    pub write_vtt: bool,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            out_dir: None,
            write_vtt: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> ShotplanResult<()> {
        if self.concurrency == 0 {
            return Err(ShotplanError::validation("concurrency must be >= 1"));
        }
        if self.default_languages.iter().any(|l| l.trim().is_empty()) {
            return Err(ShotplanError::validation(
                "defaultLanguages must not contain empty entries",
            ));
        }
        self.ffmpeg.validate()
    }

    pub fn from_json_file(path: &Path) -> ShotplanResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| ShotplanError::serde(format!("config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `SHOTPLAN_CONCURRENCY` / `SHOTPLAN_FFMPEG` from the process environment.
    pub fn apply_env_overrides(self) -> ShotplanResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ShotplanResult<Self> {
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            self.concurrency = raw.trim().parse().map_err(|_| {
                ShotplanError::validation(format!(
                    "{ENV_CONCURRENCY} must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_FFMPEG)
            && !raw.trim().is_empty()
        {
            self.ffmpeg.binary = PathBuf::from(raw.trim());
        }
        self.validate()?;
        Ok(self)
    }
}

impl FfmpegConfig {
    pub fn validate(&self) -> ShotplanResult<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(ShotplanError::validation("ffmpeg binary must be non-empty"));
        }
        if self.fps == 0 {
            return Err(ShotplanError::validation("ffmpeg fps must be non-zero"));
        }
        if self.video_codec.trim().is_empty() || self.audio_codec.trim().is_empty() {
            return Err(ShotplanError::validation("ffmpeg codecs must be non-empty"));
        }
        Ok(())
    }
}
