use crate::{
    error::Result,
    types::{ContourSet, Frame, Mask},
};

/// Trait for frame smoothing ahead of segmentation
pub trait FramePreprocessor: Send + Sync {
    /// Produce a smoothed copy of the frame with identical dimensions
    fn smooth(&self, frame: &Frame) -> Result<Frame>;
}

/// Trait for turning a color frame into a foreground mask
pub trait ColorSegmenter: Send + Sync {
    /// Classify every pixel, returning a mask of the frame's size
    fn segment(&self, frame: &Frame) -> Result<Mask>;
}

/// Trait for mask cleanup algorithms
pub trait MaskFilter: Send + Sync {
    /// Produce a cleaned copy of the mask with identical dimensions
    fn clean(&self, mask: &Mask) -> Result<Mask>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Find region boundaries and their topology in a binary mask
    fn extract(&self, mask: &Mask) -> Result<ContourSet>;
}

/// Trait for rendering contours onto a frame
pub trait OverlayRenderer: Send + Sync {
    /// Draw onto `frame` in place and hand the same frame back for chaining
    fn draw<'a>(&self, frame: &'a mut Frame, contours: &ContourSet) -> Result<&'a mut Frame>;
}

/// Trait for diagnostic sinks that persist cleaned masks
pub trait MaskSnapshotSink: Send {
    /// Persist the mask under a name derived from the frame index
    fn save(&mut self, mask: &Mask, frame_index: u64) -> Result<()>;
}
