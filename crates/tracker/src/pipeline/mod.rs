pub mod builder;

use tracing::{debug, trace, warn};

use crate::{
    accumulator::{PointAccumulator, TrackedPointLog},
    config::PipelineConfig,
    error::{Result, Stage, StageContext, TrackerError},
    traits::{
        ColorSegmenter, ContourExtractor, FramePreprocessor, MaskFilter, MaskSnapshotSink,
        OverlayRenderer,
    },
    types::Frame,
};

/// Per-frame orchestrator: smooth, segment, clean, extract, overlay, record.
///
/// Owns the run's [`TrackedPointLog`], so separate instances never share state.
pub struct FramePipeline {
    preprocessor: Box<dyn FramePreprocessor>,
    segmenter: Box<dyn ColorSegmenter>,
    filter: Box<dyn MaskFilter>,
    extractor: Box<dyn ContourExtractor>,
    renderer: Box<dyn OverlayRenderer>,
    snapshots: Option<Box<dyn MaskSnapshotSink>>,
    accumulator: PointAccumulator,
}

impl FramePipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::FramePipelineBuilder {
        builder::FramePipelineBuilder::new()
    }

    /// Build the standard stages from configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(builder::FramePipelineBuilder::from_config(config)?.build())
    }

    pub fn new(
        preprocessor: Box<dyn FramePreprocessor>,
        segmenter: Box<dyn ColorSegmenter>,
        filter: Box<dyn MaskFilter>,
        extractor: Box<dyn ContourExtractor>,
        renderer: Box<dyn OverlayRenderer>,
        snapshots: Option<Box<dyn MaskSnapshotSink>>,
    ) -> Self {
        Self {
            preprocessor,
            segmenter,
            filter,
            extractor,
            renderer,
            snapshots,
            accumulator: PointAccumulator::new(),
        }
    }

    /// Process one tick.
    ///
    /// Returns `None` when no frame arrived (or it has no pixels); nothing is
    /// recorded in that case. If a stage fails the error is logged and the raw
    /// frame is handed back unmodified.
    pub fn process(&mut self, raw: Option<Frame>, frame_index: u64) -> Option<Frame> {
        let raw = match raw {
            Some(frame) if frame.width() > 0 && frame.height() > 0 => frame,
            _ => {
                trace!(tick = frame_index, "no frame this tick");
                return None;
            }
        };

        match self.try_process(&raw, frame_index) {
            Ok(output) => Some(output),
            Err(err) => {
                let stage = err.stage().map(<&'static str>::from).unwrap_or("unknown");
                warn!(tick = frame_index, stage, error = %err, "frame processing failed, passing frame through");
                Some(raw)
            }
        }
    }

    /// Run every stage, returning the overlaid copy of `raw` or the first failure.
    pub fn try_process(&mut self, raw: &Frame, frame_index: u64) -> Result<Frame> {
        let dimensions = raw.dimensions();

        let smoothed = self.preprocessor.smooth(raw).at_stage(Stage::Preprocess)?;
        ensure_dimensions(dimensions, smoothed.dimensions()).at_stage(Stage::Preprocess)?;

        let mask = self.segmenter.segment(&smoothed).at_stage(Stage::Segment)?;
        ensure_dimensions(dimensions, mask.dimensions()).at_stage(Stage::Segment)?;

        let cleaned = self.filter.clean(&mask).at_stage(Stage::Morphology)?;
        ensure_dimensions(dimensions, cleaned.dimensions()).at_stage(Stage::Morphology)?;

        if let Some(sink) = self.snapshots.as_mut() {
            if let Err(err) = sink.save(&cleaned, frame_index) {
                warn!(tick = frame_index, stage = %Stage::Snapshot, error = %err, "mask snapshot failed");
            }
        }

        let contours = self.extractor.extract(&cleaned).at_stage(Stage::Contours)?;

        let mut output = raw.clone();
        self.renderer
            .draw(&mut output, &contours)
            .at_stage(Stage::Overlay)?;

        // Only a tick that made it through every stage adds to the log
        self.accumulator.record(&contours.contours);

        debug!(
            tick = frame_index,
            contours = contours.contours.len(),
            points = contours.total_points(),
            "processed frame"
        );
        Ok(output)
    }

    /// Points accumulated so far.
    pub fn points(&self) -> &TrackedPointLog {
        self.accumulator.log()
    }

    pub fn into_points(self) -> TrackedPointLog {
        self.accumulator.into_log()
    }

    pub fn info(&self) -> String {
        format!(
            "FramePipeline: snapshots {}, {} points over {} frames",
            if self.snapshots.is_some() { "on" } else { "off" },
            self.points().len(),
            self.points().frames()
        )
    }
}

fn ensure_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(TrackerError::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            width: actual.0,
            height: actual.1,
        })
    }
}
