use xxhash_rust::xxh3::Xxh3;

use crate::{
    jobs::{RenderJobDefinition, RenderSegment},
    model::{AudioKind, OverlayKind, OverlayPlan},
};

const XXH3_SEED: u64 = 0x5d1c_9e3f_a4b2_7081;

/// 128-bit content hash of one or more scene jobs.
///
/// Equal job lists hash equal across processes, so a caller can compare against a previously
/// stored value to skip an identical re-render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobFingerprint {
    pub hi: u64,
    pub lo: u64,
}

impl std::fmt::Display for JobFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

pub fn fingerprint_job(job: &RenderJobDefinition) -> JobFingerprint {
    let mut h = StableHasher::new();
    write_job(&mut h, job);
    h.finish()
}

pub fn fingerprint_jobs(jobs: &[RenderJobDefinition]) -> JobFingerprint {
    let mut h = StableHasher::new();
    h.write_u64(jobs.len() as u64);
    for job in jobs {
        write_job(&mut h, job);
    }
    h.finish()
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn write_opt_f64(&mut self, v: Option<f64>) {
        match v {
            Some(x) => {
                self.write_u8(1);
                self.write_f64(x);
            }
            None => self.write_u8(0),
        }
    }

    fn write_opt_str(&mut self, v: Option<&str>) {
        match v {
            Some(s) => {
                self.write_u8(1);
                self.write_str(s);
            }
            None => self.write_u8(0),
        }
    }

    fn finish(self) -> JobFingerprint {
        let v = self.inner.digest128();
        JobFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

fn write_job(h: &mut StableHasher, job: &RenderJobDefinition) {
    h.write_str(&job.job_id);
    h.write_str(&job.scene_id);
    h.write_u32(job.order as u32);

    let zone = &job.safe_zone_preset;
    h.write_str(&zone.id);
    for v in [
        zone.width,
        zone.height,
        zone.inset.top,
        zone.inset.right,
        zone.inset.bottom,
        zone.inset.left,
    ] {
        h.write_u32(v);
    }

    h.write_str(&job.brand_lut.id);
    h.write_opt_str(job.brand_lut.lut_path.as_deref());
    h.write_f64(job.brand_lut.intensity);

    h.write_u64(job.segments.len() as u64);
    for seg in &job.segments {
        write_segment(h, seg);
    }

    h.write_u64(job.overlays.len() as u64);
    for overlay in &job.overlays {
        write_overlay(h, overlay);
    }

    match &job.audio {
        Some(audio) => {
            h.write_u8(1);
            h.write_u8(match audio.kind {
                AudioKind::Voiceover => 0,
                AudioKind::Music => 1,
                AudioKind::Dialog => 2,
            });
            h.write_str(&audio.src);
            h.write_opt_f64(audio.gain);
        }
        None => h.write_u8(0),
    }

    match &job.caption_hint {
        Some(hint) => {
            h.write_u8(1);
            h.write_opt_str(hint.prompt.as_deref());
            h.write_opt_str(hint.default_language.as_deref());
            h.write_u64(hint.additional_languages.len() as u64);
            for lang in &hint.additional_languages {
                h.write_str(lang);
            }
        }
        None => h.write_u8(0),
    }

    h.write_str(&job.output_path.to_string_lossy());
    h.write_f64(job.estimated_duration);
}

fn write_segment(h: &mut StableHasher, seg: &RenderSegment) {
    h.write_str(&seg.clip_id);
    h.write_str(&seg.source);
    h.write_f64(seg.duration);
    h.write_opt_f64(seg.trim_start);
    h.write_opt_f64(seg.trim_end);
}

fn write_overlay(h: &mut StableHasher, overlay: &OverlayPlan) {
    h.write_u8(match overlay.kind {
        OverlayKind::Logo => 0,
        OverlayKind::LowerThird => 1,
        OverlayKind::Cta => 2,
        OverlayKind::Slug => 3,
    });
    h.write_str(&overlay.src);
    h.write_opt_f64(overlay.start);
    h.write_opt_f64(overlay.end);
    h.write_opt_str(overlay.safe_zone.as_deref());
}
