//! Configuration structures for the table reconstruction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TabscanError;
use crate::layout::{ConfidenceThresholds, DEFAULT_GREEN_THRESHOLD, DEFAULT_YELLOW_THRESHOLD};

/// Main configuration for tabscan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TabscanConfig {
    /// Row clustering configuration.
    pub layout: LayoutConfig,

    /// Confidence tier thresholds.
    pub confidence: ConfidenceConfig,

    /// Output artifact configuration.
    pub export: ExportConfig,

    /// Overlay drawing configuration.
    pub overlay: OverlayConfig,
}

/// Row clustering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Maximum vertical distance (pixels) from a row's first detection.
    pub y_threshold: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { y_threshold: 10.0 }
    }
}

/// Confidence tier thresholds (0.0 - 1.0).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Lower bound of the high (green) tier.
    pub green_threshold: f32,

    /// Lower bound of the medium (yellow) tier.
    pub yellow_threshold: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            green_threshold: DEFAULT_GREEN_THRESHOLD,
            yellow_threshold: DEFAULT_YELLOW_THRESHOLD,
        }
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Characters added to the longest text of each column.
    pub column_padding: usize,

    /// Directory for outputs. Defaults to the input's directory.
    pub output_dir: Option<PathBuf>,

    /// File extension (and format) of the overlay image.
    pub overlay_extension: String,

    /// Also render a PNG snapshot of the grid.
    pub write_preview: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            column_padding: 2,
            output_dir: None,
            overlay_extension: "jpg".to_string(),
            write_preview: false,
        }
    }
}

/// Overlay drawing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// TrueType font for labels. System fonts are tried when unset.
    pub font_path: Option<PathBuf>,

    /// Label font size in pixels.
    pub font_scale: f32,

    /// Outline thickness in pixels.
    pub line_thickness: u32,

    /// Distance of the label above the region's first corner.
    pub label_offset: i32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_scale: 16.0,
            line_thickness: 2,
            label_offset: 20,
        }
    }
}

impl TabscanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Resolve the confidence thresholds, clamping an inverted pair.
    pub fn thresholds(&self) -> Result<ConfidenceThresholds, TabscanError> {
        ConfidenceThresholds::new(
            self.confidence.green_threshold,
            self.confidence.yellow_threshold,
        )
    }

    /// Check values that would otherwise fail deep inside a request.
    pub fn validate(&self) -> Result<(), TabscanError> {
        if !self.layout.y_threshold.is_finite() || self.layout.y_threshold < 0.0 {
            return Err(TabscanError::Config(format!(
                "y_threshold must be a non-negative number, got {}",
                self.layout.y_threshold
            )));
        }
        if self.overlay.font_scale <= 0.0 || !self.overlay.font_scale.is_finite() {
            return Err(TabscanError::Config(format!(
                "font_scale must be positive, got {}",
                self.overlay.font_scale
            )));
        }
        if self.export.overlay_extension.trim().is_empty() {
            return Err(TabscanError::Config(
                "overlay_extension must not be empty".to_string(),
            ));
        }
        self.thresholds().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TabscanConfig::default();
        assert_eq!(config.layout.y_threshold, 10.0);
        assert_eq!(config.confidence.green_threshold, 0.97);
        assert_eq!(config.confidence.yellow_threshold, 0.92);
        assert_eq!(config.export.column_padding, 2);
        assert_eq!(config.export.overlay_extension, "jpg");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TabscanConfig =
            serde_json::from_str(r#"{"layout": {"y_threshold": 14.5}}"#).unwrap();
        assert_eq!(config.layout.y_threshold, 14.5);
        assert_eq!(config.confidence.yellow_threshold, 0.92);
        assert_eq!(config.overlay.line_thickness, 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = TabscanConfig::default();
        config.confidence.green_threshold = 0.99;
        config.export.write_preview = true;
        config.save(&path).unwrap();

        let loaded = TabscanConfig::from_file(&path).unwrap();
        assert_eq!(loaded.confidence.green_threshold, 0.99);
        assert!(loaded.export.write_preview);
    }

    #[test]
    fn test_validate_rejects_negative_threshold() {
        let mut config = TabscanConfig::default();
        config.layout.y_threshold = -1.0;
        assert!(matches!(config.validate(), Err(TabscanError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let mut config = TabscanConfig::default();
        config.confidence.green_threshold = 97.0;
        assert!(matches!(config.validate(), Err(TabscanError::Config(_))));
    }
}
