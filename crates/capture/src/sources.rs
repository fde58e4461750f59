use std::fmt::Debug;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{debug, warn};
use tracker::Frame;

use crate::{CaptureError, Result};

/// A device frames can be captured from.
/// Opening is the only point where a missing device is reported.
pub trait FrameSource: Debug {
    type Stream: FrameStream;

    /// Open the device, failing with [`CaptureError::DeviceUnavailable`].
    fn open(&self) -> Result<Self::Stream>;

    /// Get a human-readable description of this source
    fn description(&self) -> String;
}

/// An opened capture stream.
pub trait FrameStream {
    /// Next frame, or `None` when nothing is available this tick.
    fn read(&mut self) -> Option<Frame>;

    /// Close the underlying device.
    fn release(self);
}

/// Treats a directory of still images as a camera, one image per read.
#[derive(Debug, Clone)]
pub struct ImageDirectorySource {
    pub path: PathBuf,
    pub loop_playback: bool,
}

impl ImageDirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loop_playback: false,
        }
    }

    pub fn with_loop_playback(mut self, loop_playback: bool) -> Self {
        self.loop_playback = loop_playback;
        self
    }

    fn unavailable(&self, reason: impl Into<String>) -> CaptureError {
        CaptureError::DeviceUnavailable {
            device: self.description(),
            reason: reason.into(),
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    path.is_file() && ImageFormat::from_path(path).is_ok()
}

impl FrameSource for ImageDirectorySource {
    type Stream = ImageDirectoryStream;

    fn open(&self) -> Result<ImageDirectoryStream> {
        let entries = std::fs::read_dir(&self.path).map_err(|e| self.unavailable(e.to_string()))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        if files.is_empty() {
            return Err(self.unavailable("no image files found"));
        }
        files.sort();

        debug!(source = %self.description(), frames = files.len(), "opened frame source");
        Ok(ImageDirectoryStream {
            files,
            cursor: 0,
            loop_playback: self.loop_playback,
        })
    }

    fn description(&self) -> String {
        format!("Image directory: {}", self.path.display())
    }
}

#[derive(Debug)]
pub struct ImageDirectoryStream {
    files: Vec<PathBuf>,
    cursor: usize,
    loop_playback: bool,
}

impl ImageDirectoryStream {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameStream for ImageDirectoryStream {
    fn read(&mut self) -> Option<Frame> {
        if self.cursor >= self.files.len() && self.loop_playback {
            self.cursor = 0;
        }
        let path = self.files.get(self.cursor)?;
        self.cursor += 1;

        match image::open(path) {
            Ok(image) => Some(image.to_rgb8()),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "undecodable frame, treating tick as empty");
                None
            }
        }
    }

    fn release(self) {
        debug!(frames = self.files.len(), read = self.cursor, "released frame source");
    }
}
