use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::types::{ColorRange, KernelSize};

/// Tunables of the frame-processing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    /// HSV bounds a pixel must fall in to count as marker
    pub color_range: ColorRange,
    /// Box blur window; both sides must be odd
    pub blur_kernel: KernelSize,
    pub erode_kernel: KernelSize,
    pub dilate_kernel: KernelSize,
    pub erode_passes: u32,
    pub dilate_passes: u32,
    /// RGB color of the drawn outlines
    pub overlay_color: [u8; 3],
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            color_range: ColorRange::default(),
            blur_kernel: KernelSize::square(7),
            erode_kernel: KernelSize::square(12),
            dilate_kernel: KernelSize::square(24),
            erode_passes: 2,
            dilate_passes: 2,
            overlay_color: [0, 0, 250],
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.color_range.validate()?;
        if self.blur_kernel.width % 2 == 0 || self.blur_kernel.height % 2 == 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "blur kernel sides must be odd, got {}x{}",
                self.blur_kernel.width, self.blur_kernel.height
            )));
        }
        for (name, kernel) in [("erode", self.erode_kernel), ("dilate", self.dilate_kernel)] {
            if kernel.width == 0 || kernel.height == 0 {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} kernel must be non-empty, got {}x{}",
                    kernel.width, kernel.height
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.blur_kernel, KernelSize::square(7));
        assert_eq!(config.erode_kernel, KernelSize::square(12));
        assert_eq!(config.dilate_kernel, KernelSize::square(24));
        assert_eq!((config.erode_passes, config.dilate_passes), (2, 2));
        assert_eq!(config.color_range.value_min, 88.45);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "erode_passes": 1, "overlay_color": [255, 0, 0] }"#).unwrap();
        assert_eq!(config.erode_passes, 1);
        assert_eq!(config.overlay_color, [255, 0, 0]);
        assert_eq!(config.dilate_passes, 2);
    }

    #[test]
    fn test_validation_rejects_bad_kernels() {
        let even_blur = PipelineConfig { blur_kernel: KernelSize::square(8), ..Default::default() };
        assert!(even_blur.validate().is_err());

        let empty_erode = PipelineConfig {
            erode_kernel: KernelSize { width: 0, height: 12 },
            ..Default::default()
        };
        assert!(empty_erode.validate().is_err());
    }
}
