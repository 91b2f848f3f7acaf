use crate::geometry::RibbonOrientation;
use crate::stroke::{StrokeColor, StrokePolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for drawing. Every field has a default, so a config file only
/// needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    /// Ribbon width in meters.
    pub stroke_width: f32,
    /// Width of the captured-image plane in meters.
    pub image_plane_width: f32,
    /// Distance in front of the camera at which the viewport center is resolved.
    pub center_depth: f32,
    /// Stamp a captured frame at the start of every stroke.
    pub capture_on_touch: bool,
    pub default_color: StrokeColor,
    pub orientation: RibbonOrientation,
    pub min_segment_length: f32,
    pub max_points_per_stroke: Option<usize>,
    /// Per-frame update budget; slower frames are logged and counted.
    pub frame_budget_ms: f32,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            stroke_width: 0.004,
            image_plane_width: 0.11,
            center_depth: 0.1,
            capture_on_touch: true,
            default_color: StrokeColor::WHITE,
            orientation: RibbonOrientation::default(),
            min_segment_length: 1e-6,
            max_points_per_stroke: None,
            frame_budget_ms: 16.0,
        }
    }
}

impl SketchConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SketchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |value: f32| value.is_finite() && value > 0.0;
        if !positive(self.stroke_width) {
            return Err(ConfigError::Invalid(format!(
                "stroke_width must be positive, got {}",
                self.stroke_width
            )));
        }
        if !positive(self.image_plane_width) {
            return Err(ConfigError::Invalid(format!(
                "image_plane_width must be positive, got {}",
                self.image_plane_width
            )));
        }
        if !positive(self.center_depth) {
            return Err(ConfigError::Invalid(format!(
                "center_depth must be positive, got {}",
                self.center_depth
            )));
        }
        if !(self.min_segment_length.is_finite() && self.min_segment_length >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_segment_length must be non-negative, got {}",
                self.min_segment_length
            )));
        }
        if self.max_points_per_stroke == Some(0) {
            return Err(ConfigError::Invalid(
                "max_points_per_stroke must allow at least one point".into(),
            ));
        }
        if !positive(self.frame_budget_ms) {
            return Err(ConfigError::Invalid(format!(
                "frame_budget_ms must be positive, got {}",
                self.frame_budget_ms
            )));
        }
        Ok(())
    }

    pub fn stroke_policy(&self) -> StrokePolicy {
        StrokePolicy {
            orientation: self.orientation,
            min_segment_length: self.min_segment_length,
            max_points_per_stroke: self.max_points_per_stroke,
        }
    }
}
