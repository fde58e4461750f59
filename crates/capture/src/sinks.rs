use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;
use tracing::{debug, info};
use tracker::Frame;

/// Recording and diagnostic write failures. Logged by the pump, never fatal to a run.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("Frame size {actual:?} does not match recording size {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Invalid sink parameter: {0}")]
    InvalidParameter(String),
}

/// Destination for processed frames.
pub trait FrameSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Flush and close the sink. Consumes it so it cannot be released twice.
    fn release(self: Box<Self>) -> Result<(), SinkError>;

    fn description(&self) -> String;
}

#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FrameFormat {
    /// Lossless
    #[default]
    Png,
    Jpeg,
}

impl FrameFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FrameFormat::Png => "png",
            FrameFormat::Jpeg => "jpg",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            FrameFormat::Png => ImageFormat::Png,
            FrameFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Written next to the frames when an [`ImageSequenceSink`] is released.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingManifest {
    pub fps: f64,
    pub format: FrameFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frames: u64,
}

/// Records frames as a numbered image sequence (`frame_0000.png`, ...).
///
/// The frame size is fixed either at creation or by the first written frame;
/// frames of any other size are rejected.
#[derive(Debug)]
pub struct ImageSequenceSink {
    dir: PathBuf,
    format: FrameFormat,
    fps: f64,
    size: Option<(u32, u32)>,
    written: u64,
}

impl ImageSequenceSink {
    pub const MANIFEST_FILE: &'static str = "manifest.json";

    pub fn create(
        dir: impl Into<PathBuf>,
        format: FrameFormat,
        fps: f64,
        size: Option<(u32, u32)>,
    ) -> Result<Self, SinkError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SinkError::InvalidParameter(format!("fps must be positive, got {fps}")));
        }
        if let Some((0, _) | (_, 0)) = size {
            return Err(SinkError::InvalidParameter("frame size must be non-empty".into()));
        }

        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), %format, fps, "created recording sink");
        Ok(Self { dir, format, fps, size, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:04}.{}", self.format.extension()))
    }

    pub fn manifest(&self) -> RecordingManifest {
        RecordingManifest {
            fps: self.fps,
            format: self.format,
            width: self.size.map(|(w, _)| w),
            height: self.size.map(|(_, h)| h),
            frames: self.written,
        }
    }
}

impl FrameSink for ImageSequenceSink {
    fn write(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let actual = frame.dimensions();
        if let Some(expected) = self.size.filter(|&expected| expected != actual) {
            return Err(SinkError::SizeMismatch { expected, actual });
        }

        let path = self.frame_path(self.written);
        frame.save_with_format(&path, self.format.image_format())?;
        // The first frame on disk fixes the recording size
        self.size.get_or_insert(actual);
        self.written += 1;
        Ok(())
    }

    fn release(self: Box<Self>) -> Result<(), SinkError> {
        let manifest = self.manifest();
        let writer = BufWriter::new(File::create(self.dir.join(Self::MANIFEST_FILE))?);
        serde_json::to_writer_pretty(writer, &manifest)?;
        info!(dir = %self.dir.display(), frames = manifest.frames, "recording finished");
        Ok(())
    }

    fn description(&self) -> String {
        format!("Image sequence: {} ({})", self.dir.display(), self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_writes_numbered_frames_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("recording");
        let mut sink = ImageSequenceSink::create(&out, FrameFormat::Png, 30.0, None).unwrap();

        let frame = Frame::from_pixel(8, 6, Rgb([1, 2, 3]));
        sink.write(&frame).unwrap();
        sink.write(&frame).unwrap();
        Box::new(sink).release().unwrap();

        assert!(out.join("frame_0000.png").exists());
        assert!(out.join("frame_0001.png").exists());
        let decoded = image::open(out.join("frame_0001.png")).unwrap().to_rgb8();
        assert_eq!(decoded, frame);

        let manifest: RecordingManifest = serde_json::from_reader(
            File::open(out.join(ImageSequenceSink::MANIFEST_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.frames, 2);
        assert_eq!((manifest.width, manifest.height), (Some(8), Some(6)));
        assert_eq!(manifest.fps, 30.0);
    }

    #[test]
    fn test_size_locked_by_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::create(dir.path(), FrameFormat::Jpeg, 30.0, None).unwrap();

        sink.write(&Frame::new(10, 10)).unwrap();
        let err = sink.write(&Frame::new(12, 10)).unwrap_err();
        assert!(matches!(err, SinkError::SizeMismatch { expected: (10, 10), actual: (12, 10) }));
        assert_eq!(sink.written(), 1);
        assert!(dir.path().join("frame_0000.jpg").exists());
    }

    #[test]
    fn test_failed_write_leaves_size_open() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("recording");
        let mut sink = ImageSequenceSink::create(&out, FrameFormat::Png, 30.0, None).unwrap();

        std::fs::remove_dir_all(&out).unwrap();
        assert!(matches!(sink.write(&Frame::new(10, 10)), Err(SinkError::Image(_))));
        assert_eq!(sink.written(), 0);

        std::fs::create_dir_all(&out).unwrap();
        sink.write(&Frame::new(12, 10)).unwrap();
        assert_eq!(sink.written(), 1);
        assert!(out.join("frame_0000.png").exists());
        assert!(matches!(
            sink.write(&Frame::new(10, 10)),
            Err(SinkError::SizeMismatch { expected: (12, 10), .. })
        ));
    }

    #[test]
    fn test_size_fixed_at_creation() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink =
            ImageSequenceSink::create(dir.path(), FrameFormat::Png, 30.0, Some((4, 4))).unwrap();
        assert!(sink.write(&Frame::new(5, 4)).is_err());
        assert_eq!(sink.written(), 0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceSink::create(dir.path(), FrameFormat::Png, 0.0, None).is_err());
        assert!(ImageSequenceSink::create(dir.path(), FrameFormat::Png, 30.0, Some((0, 4))).is_err());
    }

    #[test]
    fn test_format_names() {
        assert_eq!("jpeg".parse::<FrameFormat>().unwrap(), FrameFormat::Jpeg);
        assert_eq!(FrameFormat::Png.to_string(), "png");
        assert_eq!(FrameFormat::Jpeg.extension(), "jpg");
    }
}
