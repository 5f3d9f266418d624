use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::affine::DEFAULT_EPSILON;
use crate::error::Result;
use crate::types::LandmarkModel;

/// Engine settings, loadable from a JSON file.
///
/// ```json
/// { "model": "face_mesh468", "eye_indices": [33, 263], "epsilon": 1e-6 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Detector layout the landmark sets come from.
    pub model: LandmarkModel,
    /// Overrides the model's default eye landmark pair.
    pub eye_indices: Option<(usize, usize)>,
    /// Use eye contour centroids instead of single eye landmarks, when the
    /// model has contours.
    pub eye_contours: bool,
    /// Areas and distances at or below this count as degenerate.
    pub epsilon: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: LandmarkModel::default(),
            eye_indices: None,
            eye_contours: false,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Eye landmark pair used for similarity alignment.
    pub fn eye_pair(&self) -> (usize, usize) {
        self.eye_indices.unwrap_or_else(|| self.model.eye_indices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"model":"face_mesh468"}"#).unwrap();
        assert_eq!(cfg.model, LandmarkModel::FaceMesh468);
        assert_eq!(cfg.epsilon, DEFAULT_EPSILON);
        assert_eq!(cfg.eye_pair(), (33, 263));
        assert!(!cfg.eye_contours);
    }

    #[test]
    fn eye_override() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"eye_indices":[39,42]}"#).unwrap();
        assert_eq!(cfg.model, LandmarkModel::Dlib68);
        assert_eq!(cfg.eye_pair(), (39, 42));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join("face_warp_test_config.json");
        std::fs::write(&path, r#"{"epsilon":0.5}"#).unwrap();
        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.epsilon, 0.5);
        std::fs::remove_file(path).ok();
    }
}
