use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::debug;

use crate::{error::Result, traits::MaskSnapshotSink, types::Mask};

/// Writes each cleaned mask as `<frame index>.png` into a directory.
#[derive(Debug, Clone)]
pub struct PngSnapshotWriter {
    dir: PathBuf,
}

impl PngSnapshotWriter {
    /// Create the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, frame_index: u64) -> PathBuf {
        self.dir.join(format!("{frame_index}.png"))
    }
}

impl MaskSnapshotSink for PngSnapshotWriter {
    fn save(&mut self, mask: &Mask, frame_index: u64) -> Result<()> {
        let path = self.path_for(frame_index);
        mask.save_with_format(&path, ImageFormat::Png)?;
        debug!(path = %path.display(), "saved mask snapshot");
        Ok(())
    }
}
