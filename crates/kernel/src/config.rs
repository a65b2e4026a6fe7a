use donutfield_assets::{TextParams, TorusParams};
use donutfield_common::MAX_PIXEL_RATIO;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Camera placement and projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of remaining orbit motion applied per frame.
    pub damping_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [1.0, 1.0, 2.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 100.0,
            near: 0.1,
            far: 100.0,
            damping_factor: 0.05,
        }
    }
}

/// Everything needed to build the scene, independent of any window or device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub donut_count: usize,
    /// Side length of the cube donuts are scattered in.
    pub spread: f32,
    pub torus: TorusParams,
    pub label: String,
    pub text: TextParams,
    /// Font path relative to the asset root.
    pub font_path: String,
    pub background: [f32; 4],
    /// Upper bound on the device pixel ratio used for the render surface.
    pub max_pixel_ratio: f64,
    pub camera: CameraConfig,
    /// Seed for donut placement; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            donut_count: 100,
            spread: 10.0,
            torus: TorusParams::default(),
            label: "Houcine Taki".to_string(),
            text: TextParams::default(),
            font_path: "fonts/helvetiker_regular.typeface.json".to_string(),
            background: [1.0, 1.0, 1.0, 1.0],
            max_pixel_ratio: MAX_PIXEL_RATIO,
            camera: CameraConfig::default(),
            seed: None,
        }
    }
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), "loaded scene config");
        Ok(config)
    }

    /// Load `path` when given, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.donut_count, 100);
        assert_eq!(config.spread, 10.0);
        assert_eq!(config.label, "Houcine Taki");
        assert_eq!(config.background, [1.0; 4]);
        assert_eq!(config.max_pixel_ratio, 2.0);
        assert_eq!(config.camera.position, [1.0, 1.0, 2.0]);
        assert_eq!(config.camera.fov_degrees, 100.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SceneConfig::from_json(r#"{ "donut_count": 12, "seed": 9 }"#).unwrap();
        assert_eq!(config.donut_count, 12);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.torus, TorusParams::default());
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn config_file_overrides_pixel_ratio_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, r#"{ "max_pixel_ratio": 1.5, "label": "Hi" }"#).unwrap();

        let config = SceneConfig::load(Some(&path)).unwrap();
        assert_eq!(config.max_pixel_ratio, 1.5);
        assert_eq!(config.label, "Hi");
        assert_eq!(config.donut_count, 100);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SceneConfig::from_path(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(SceneConfig::load(None).unwrap(), SceneConfig::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(
            SceneConfig::from_json("{ donut_count: }"),
            Err(ConfigError::Json(_))
        ));
    }
}
