use capture::{CaptureConfig, FrameFormat, FrameSink, ImageSequenceSink, SinkError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use tracker::{FramePipeline, FramePipelineBuilder, PipelineConfig, PngSnapshotWriter, TrackedPointLog, TrackerError};

#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Where frames come from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory of still images played back as a camera
    pub path: PathBuf,
    /// Restart from the first image once the directory is exhausted
    pub loop_playback: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("frames"),
            loop_playback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RecordingConfig {
    pub output_dir: PathBuf,
    pub format: FrameFormat,
    /// Defaults to the rate implied by the tick interval
    pub fps: Option<f64>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recording"),
            format: FrameFormat::Png,
            fps: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SnapshotConfig {
    /// Cleaned masks are written here as `<frame index>.png`
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Write the tracked points as JSON after the run
    pub points_output: Option<PathBuf>,
    /// Log every tracked point at info level instead of debug
    pub log_points: bool,
}

/// Complete configuration of a tracking run
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub recording: Option<RecordingConfig>,
    pub snapshots: Option<SnapshotConfig>,
    pub report: ReportConfig,
    pub pipeline: PipelineConfig,
    pub capture: CaptureConfig,
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub frame_limit: Option<u64>,
    pub continuous: bool,
    pub record: Option<PathBuf>,
    pub snapshots: Option<PathBuf>,
    pub points_output: Option<PathBuf>,
}

impl AppConfig {
    /// Load AppConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, AppConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, AppConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load AppConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, AppConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, AppConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(AppConfigError::UnsupportedFileFormat),
        }
    }

    /// Save to `.toml` or `.json` depending on the extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AppConfigError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(AppConfigError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, AppConfigError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, AppConfigError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(path) = overrides.source {
            self.source.path = path;
        }
        if overrides.continuous {
            self.capture.frame_limit = None;
        } else if let Some(limit) = overrides.frame_limit {
            self.capture.frame_limit = Some(limit);
        }
        if let Some(output_dir) = overrides.record {
            let recording = self.recording.get_or_insert_with(RecordingConfig::default);
            recording.output_dir = output_dir;
        }
        if let Some(output_dir) = overrides.snapshots {
            self.snapshots = Some(SnapshotConfig { output_dir });
        }
        if let Some(path) = overrides.points_output {
            self.report.points_output = Some(path);
        }
    }

    pub fn validate(&self) -> Result<(), AppConfigError> {
        self.pipeline
            .validate()
            .map_err(|e| AppConfigError::Invalid(e.to_string()))?;
        self.capture
            .validate()
            .map_err(|e| AppConfigError::Invalid(e.to_string()))?;
        if let Some(fps) = self.recording.as_ref().and_then(|r| r.fps) {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(AppConfigError::Invalid(format!("recording fps must be positive, got {fps}")));
            }
        }
        Ok(())
    }

    /// Pipeline with the configured stages and mask snapshots, if enabled.
    pub fn build_pipeline(&self) -> Result<FramePipeline, TrackerError> {
        let mut builder = FramePipelineBuilder::from_config(&self.pipeline)?;
        if let Some(snapshots) = &self.snapshots {
            builder = builder.with_snapshots(PngSnapshotWriter::create(&snapshots.output_dir)?);
        }
        Ok(builder.build())
    }

    /// Recording sink, if enabled.
    pub fn build_sink(&self) -> Result<Option<Box<dyn FrameSink>>, SinkError> {
        let Some(recording) = &self.recording else {
            return Ok(None);
        };
        let fps = recording.fps.unwrap_or_else(|| self.capture.fps());
        let sink = ImageSequenceSink::create(&recording.output_dir, recording.format, fps, None)?;
        Ok(Some(Box::new(sink)))
    }
}

/// Log the tracked points and, if configured, save them as JSON.
pub fn report_points(config: &ReportConfig, log: &TrackedPointLog) -> Result<(), AppConfigError> {
    info!(points = log.len(), frames = log.frames(), "tracked point log");
    for point in log.points() {
        if config.log_points {
            info!(x = point.x, y = point.y, "tracked point");
        } else {
            debug!(x = point.x, y = point.y, "tracked point");
        }
    }

    if let Some(path) = &config.points_output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&log.report())?)?;
        info!(path = %path.display(), "saved tracked points");
    }
    Ok(())
}
