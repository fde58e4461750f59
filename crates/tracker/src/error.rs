use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// The pipeline stage a failure was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Preprocess,
    Segment,
    Morphology,
    Snapshot,
    Contours,
    Overlay,
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Expected a {expected_width}x{expected_height} image, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("Contour hierarchy is inconsistent: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<TrackerError>,
    },
}

impl TrackerError {
    /// The stage this error was tagged with, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Internal-consistency failures of a [`crate::ContourHierarchy`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("sibling chain revisits contour {0}")]
    SiblingCycle(usize),

    #[error("contour {from} links to contour {to}, but only {len} contours exist")]
    DanglingLink { from: usize, to: usize, len: usize },

    #[error("contour {from} links to contour {to}, which does not link back")]
    BrokenBackLink { from: usize, to: usize },

    #[error("contour {0} is not reachable from the top-level chain")]
    Unreachable(usize),

    #[error("hole contour {0} has no enclosing outer boundary")]
    OrphanHole(usize),

    #[error("hierarchy has {nodes} nodes for {contours} contours")]
    SizeMismatch { nodes: usize, contours: usize },
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Tags an error with the stage that produced it.
pub trait StageContext<T> {
    fn at_stage(self, stage: Stage) -> Result<T>;
}

impl<T, E> StageContext<T> for std::result::Result<T, E>
where
    E: Into<TrackerError>,
{
    fn at_stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| TrackerError::Stage {
            stage,
            source: Box::new(e.into()),
        })
    }
}
