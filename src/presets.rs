use crate::error::{ShotplanError, ShotplanResult};

/// Output canvas plus the inset region overlays must stay inside.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeZonePreset {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub inset: Insets,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Insets {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl SafeZonePreset {
    /// `(x, y, width, height)` of the area left after insets.
    pub fn content_box(&self) -> (u32, u32, u32, u32) {
        let w = self
            .width
            .saturating_sub(self.inset.left + self.inset.right);
        let h = self
            .height
            .saturating_sub(self.inset.top + self.inset.bottom);
        (self.inset.left, self.inset.top, w, h)
    }
}

/// Color look-up table applied to every scene of a brand.
///
/// `lut_path: None` is the baseline look (no grading filter).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandLookupTable {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lut_path: Option<String>,
    pub intensity: f64, // 0..1
}

pub const DEFAULT_BRAND_LUT: &str = "default";

struct SafeZoneEntry {
    id: &'static str,
    width: u32,
    height: u32,
    inset: Insets,
}

const SAFE_ZONES: &[SafeZoneEntry] = &[
    SafeZoneEntry {
        id: "vertical-9x16",
        width: 1080,
        height: 1920,
        inset: Insets {
            top: 220,
            right: 60,
            bottom: 380,
            left: 60,
        },
    },
    SafeZoneEntry {
        id: "square-1x1",
        width: 1080,
        height: 1080,
        inset: Insets {
            top: 80,
            right: 80,
            bottom: 120,
            left: 80,
        },
    },
    SafeZoneEntry {
        id: "landscape-16x9",
        width: 1920,
        height: 1080,
        inset: Insets {
            top: 54,
            right: 96,
            bottom: 54,
            left: 96,
        },
    },
    SafeZoneEntry {
        id: "portrait-4x5",
        width: 1080,
        height: 1350,
        inset: Insets {
            top: 100,
            right: 60,
            bottom: 160,
            left: 60,
        },
    },
];

struct LutEntry {
    id: &'static str,
    lut_path: Option<&'static str>,
    intensity: f64,
}

const BRAND_LUTS: &[LutEntry] = &[
    LutEntry {
        id: DEFAULT_BRAND_LUT,
        lut_path: None,
        intensity: 1.0,
    },
    LutEntry {
        id: "sunset",
        lut_path: Some("luts/sunset.cube"),
        intensity: 0.85,
    },
    LutEntry {
        id: "nocturne",
        lut_path: Some("luts/nocturne.cube"),
        intensity: 0.7,
    },
    LutEntry {
        id: "mono",
        lut_path: Some("luts/mono.cube"),
        intensity: 1.0,
    },
];

/// Look up a safe-zone preset. Unknown ids are an error: crop geometry never defaults.
pub fn resolve_safe_zone_preset(id: &str) -> ShotplanResult<SafeZonePreset> {
    SAFE_ZONES
        .iter()
        .find(|e| e.id == id)
        .map(|e| SafeZonePreset {
            id: e.id.to_string(),
            width: e.width,
            height: e.height,
            inset: e.inset,
        })
        .ok_or_else(|| ShotplanError::unknown_preset(id))
}

/// Look up a brand LUT, falling back to the `"default"` entry for unknown brands.
pub fn resolve_brand_lut(brand_id: &str) -> BrandLookupTable {
    let entry = BRAND_LUTS
        .iter()
        .find(|e| e.id == brand_id)
        .unwrap_or(&BRAND_LUTS[0]);
    BrandLookupTable {
        id: entry.id.to_string(),
        lut_path: entry.lut_path.map(str::to_string),
        intensity: entry.intensity,
    }
}

pub fn safe_zone_preset_ids() -> impl Iterator<Item = &'static str> {
    SAFE_ZONES.iter().map(|e| e.id)
}
