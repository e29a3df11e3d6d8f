pub type ShotplanResult<T> = Result<T, ShotplanError>;

#[derive(thiserror::Error, Debug)]
pub enum ShotplanError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown safe-zone preset '{id}'")]
    UnknownPreset { id: String },

    #[error("address not found: {0}")]
    AddressNotFound(String),

    #[error("render error in scene '{scene_id}': {message}")]
    Render { scene_id: String, message: String },

    #[error("stitch error: {0}")]
    Stitch(String),

    #[error("caption error: {0}")]
    Caption(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShotplanError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unknown_preset(id: impl Into<String>) -> Self {
        Self::UnknownPreset { id: id.into() }
    }

    pub fn address_not_found(msg: impl Into<String>) -> Self {
        Self::AddressNotFound(msg.into())
    }

    pub fn render(scene_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Render {
            scene_id: scene_id.into(),
            message: msg.into(),
        }
    }

    pub fn stitch(msg: impl Into<String>) -> Self {
        Self::Stitch(msg.into())
    }

    pub fn caption(msg: impl Into<String>) -> Self {
        Self::Caption(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for ShotplanError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ShotplanError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            ShotplanError::address_not_found("x")
                .to_string()
                .contains("address not found:")
        );
        assert!(
            ShotplanError::stitch("x")
                .to_string()
                .contains("stitch error:")
        );
        assert!(
            ShotplanError::caption("x")
                .to_string()
                .contains("caption error:")
        );
        assert!(
            ShotplanError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn render_and_preset_errors_name_their_subject() {
        let err = ShotplanError::render("s2", "encoder crashed");
        assert_eq!(
            err.to_string(),
            "render error in scene 's2': encoder crashed"
        );
        let err = ShotplanError::unknown_preset("nope");
        assert_eq!(err.to_string(), "unknown safe-zone preset 'nope'");
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ShotplanError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
