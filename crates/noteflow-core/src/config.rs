//! Tunable thresholds for the canvas core.

use crate::dispatch::DispatchConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::gesture::GestureConfig;
use crate::interaction::InteractionConfig;
use crate::viewport::ViewportConfig;
use serde::{Deserialize, Serialize};

/// Complete configuration for a [`CanvasCore`](crate::CanvasCore).
///
/// Every field has a default, so a partial JSON document such as
/// `{"gesture": {"long_press_ms": 800}}` is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub viewport: ViewportConfig,
    pub gesture: GestureConfig,
    pub dispatch: DispatchConfig,
    pub interaction: InteractionConfig,
}

impl CanvasConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CanvasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CanvasError::Config(e.to_string()))
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> CanvasResult<()> {
        let vp = &self.viewport;
        if !(vp.min_zoom.is_finite() && vp.max_zoom.is_finite()) || vp.min_zoom <= 0.0 {
            return Err(CanvasError::Config(format!(
                "zoom limits must be positive and finite, got [{}, {}]",
                vp.min_zoom, vp.max_zoom
            )));
        }
        if vp.min_zoom > vp.max_zoom {
            return Err(CanvasError::Config(format!(
                "min_zoom {} exceeds max_zoom {}",
                vp.min_zoom, vp.max_zoom
            )));
        }
        if let Some(max) = vp.max_pan_distance {
            if !(max.is_finite() && max >= 0.0) {
                return Err(CanvasError::Config(format!(
                    "max_pan_distance must be a non-negative number, got {max}"
                )));
            }
        }
        if self.interaction.drag_threshold < 0.0 || self.interaction.hit_tolerance < 0.0 {
            return Err(CanvasError::Config(
                "interaction thresholds must not be negative".to_string(),
            ));
        }
        if self.gesture.pinch_threshold < 0.0 || self.gesture.rotation_threshold < 0.0 {
            return Err(CanvasError::Config(
                "gesture thresholds must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CanvasConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = CanvasConfig::from_json(r#"{"gesture": {"long_press_ms": 800}}"#).unwrap();
        assert_eq!(config.gesture.long_press_ms, 800);
        assert_eq!(config.viewport, ViewportConfig::default());
    }

    #[test]
    fn test_inverted_zoom_limits_rejected() {
        let json = r#"{"viewport": {"min_zoom": 4.0, "max_zoom": 2.0}}"#;
        assert!(matches!(
            CanvasConfig::from_json(json),
            Err(CanvasError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(CanvasConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_values() {
        let mut config = CanvasConfig::default();
        config.interaction.drag_threshold = 7.5;
        let json = config.to_json().unwrap();
        let parsed = CanvasConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
