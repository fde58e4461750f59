//! Frame capture collaborators for the tracker: sources that produce frames,
//! sinks that record them, and the fixed-rate pump that drives a
//! [`tracker::FramePipeline`] between the two.

pub mod pump;
pub mod sinks;
pub mod sources;

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;
use tokio::time::MissedTickBehavior;

pub use pump::{CaptureHandle, FrameProcessor, RunSummary, Runner};
pub use sinks::{FrameFormat, FrameSink, ImageSequenceSink, RecordingManifest, SinkError};
pub use sources::{FrameSource, FrameStream, ImageDirectorySource, ImageDirectoryStream};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Frame source unavailable ({device}): {reason}")]
    DeviceUnavailable { device: String, reason: String },
    #[error("Invalid capture configuration: {0}")]
    InvalidConfig(String),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, CaptureError>;

/// What the pump does with a tick that came due while the previous one was
/// still processing. Ticks never overlap either way.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OverrunPolicy {
    /// Run the late tick right after the previous one, then keep the interval from there
    #[default]
    Delay,
    /// Drop missed ticks and wait for the next aligned one
    Skip,
}

impl From<OverrunPolicy> for MissedTickBehavior {
    fn from(policy: OverrunPolicy) -> Self {
        match policy {
            OverrunPolicy::Delay => MissedTickBehavior::Delay,
            OverrunPolicy::Skip => MissedTickBehavior::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CaptureConfig {
    /// Nominal time between ticks
    pub tick_interval_ms: u64,
    /// Number of ticks to run, empty ones included; `null` runs until cancelled
    pub frame_limit: Option<u64>,
    pub overrun: OverrunPolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 33,
            frame_limit: Some(30),
            overrun: OverrunPolicy::Delay,
        }
    }
}

impl CaptureConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Nominal frame rate implied by the tick interval.
    pub fn fps(&self) -> f64 {
        1000.0 / self.tick_interval_ms as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(CaptureError::InvalidConfig("tick_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_capture_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(33));
        assert_eq!(config.frame_limit, Some(30));
        assert_eq!(config.overrun, OverrunPolicy::Delay);
        assert!((config.fps() - 30.3).abs() < 0.1);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = CaptureConfig { tick_interval_ms: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(CaptureError::InvalidConfig(_))));
    }

    #[test]
    fn test_continuous_mode_from_json() {
        let config: CaptureConfig =
            serde_json::from_str(r#"{ "frame_limit": null, "overrun": "skip" }"#).unwrap();
        assert_eq!(config.frame_limit, None);
        assert_eq!(config.overrun, OverrunPolicy::Skip);
        assert_eq!(config.tick_interval_ms, 33);
    }

    #[test]
    fn test_overrun_policies_map_to_tokio() {
        for policy in OverrunPolicy::iter() {
            let behavior: MissedTickBehavior = policy.into();
            let expected = match policy {
                OverrunPolicy::Delay => MissedTickBehavior::Delay,
                OverrunPolicy::Skip => MissedTickBehavior::Skip,
            };
            assert_eq!(behavior, expected);
        }
        assert_eq!(OverrunPolicy::VARIANTS, &["delay", "skip"]);
    }
}
