//! # Color Marker Tracking Library
//!
//! Per-frame color blob detection for live video. Each frame is smoothed,
//! segmented by an HSV range, cleaned with erosion and dilation, traced into
//! contours with a two-level hierarchy, and outlined on the original frame.
//! Every contour point is kept in a run-scoped log for later inspection.
//!
//! ## Core Features
//!
//! - **Trait-based stages**: swap any stage by implementing its trait
//! - **Explicit hierarchy**: contours form a validated forest with terminating sibling chains
//! - **No shared state**: each [`FramePipeline`] owns its own [`TrackedPointLog`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tracker::{FramePipeline, PipelineConfig};
//!
//! let mut pipeline = FramePipeline::from_config(&PipelineConfig::default())?;
//!
//! let frame = image::open("frame.png")?.to_rgb8();
//! if let Some(overlaid) = pipeline.process(Some(frame), 0) {
//!     overlaid.save("overlaid.png")?;
//! }
//! println!("{} points tracked", pipeline.points().len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use tracker::{FramePipeline, algorithms::*, types::{ColorRange, KernelSize}};
//!
//! let pipeline = FramePipeline::builder()
//!     .set_segmenter(HsvRangeSegmenter::new(ColorRange { hue_min: 20.0, hue_max: 35.0, ..Default::default() }))
//!     .set_filter(ErodeDilateFilter::new(KernelSize::square(3), 1, KernelSize::square(3), 1)?)
//!     .with_snapshots(tracker::PngSnapshotWriter::create("masks")?)
//!     .build();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod hierarchy;
pub mod traits;
pub mod algorithms;
pub mod accumulator;
pub mod config;
pub mod pipeline;
pub mod snapshot;

// Re-exports for convenience
pub use error::{HierarchyError, Result, Stage, TrackerError};
pub use types::{ColorRange, Contour, ContourSet, Frame, KernelSize, Mask};
pub use hierarchy::{ContourHierarchy, HierarchyNode};
pub use traits::*;
pub use accumulator::{PointAccumulator, PointReport, TrackedPointLog};
pub use config::PipelineConfig;
pub use pipeline::{FramePipeline, builder::FramePipelineBuilder};
pub use snapshot::PngSnapshotWriter;
