use image::Rgb;

use crate::{
    algorithms::{
        BoxBlurPreprocessor, ErodeDilateFilter, HsvRangeSegmenter, OutlineRenderer,
        TwoLevelContourExtractor,
    },
    config::PipelineConfig,
    error::Result,
    pipeline::FramePipeline,
    traits::{
        ColorSegmenter, ContourExtractor, FramePreprocessor, MaskFilter, MaskSnapshotSink,
        OverlayRenderer,
    },
};

/// Builder for creating frame pipelines with a fluent API
#[derive(Default)]
pub struct FramePipelineBuilder {
    preprocessor: Option<Box<dyn FramePreprocessor>>,
    segmenter: Option<Box<dyn ColorSegmenter>>,
    filter: Option<Box<dyn MaskFilter>>,
    extractor: Option<Box<dyn ContourExtractor>>,
    renderer: Option<Box<dyn OverlayRenderer>>,
    snapshots: Option<Box<dyn MaskSnapshotSink>>,
}

impl FramePipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-populated with the standard stages tuned by `config`
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new()
            .set_preprocessor(BoxBlurPreprocessor::new(config.blur_kernel)?)
            .set_segmenter(HsvRangeSegmenter::new(config.color_range))
            .set_filter(ErodeDilateFilter::new(
                config.erode_kernel,
                config.erode_passes,
                config.dilate_kernel,
                config.dilate_passes,
            )?)
            .set_renderer(OutlineRenderer::new(Rgb(config.overlay_color))))
    }

    /// Set the smoothing stage (replaces any existing one)
    pub fn set_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: FramePreprocessor + 'static,
    {
        self.preprocessor = Some(Box::new(preprocessor));
        self
    }

    /// Set the color segmenter (replaces any existing one)
    pub fn set_segmenter<S>(mut self, segmenter: S) -> Self
    where
        S: ColorSegmenter + 'static,
    {
        self.segmenter = Some(Box::new(segmenter));
        self
    }

    /// Set the mask filter (replaces any existing one)
    pub fn set_filter<F>(mut self, filter: F) -> Self
    where
        F: MaskFilter + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// Set the overlay renderer (replaces any existing one)
    pub fn set_renderer<R>(mut self, renderer: R) -> Self
    where
        R: OverlayRenderer + 'static,
    {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Persist every cleaned mask to a snapshot sink
    pub fn with_snapshots<S>(mut self, sink: S) -> Self
    where
        S: MaskSnapshotSink + 'static,
    {
        self.snapshots = Some(Box::new(sink));
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> FramePipeline {
        FramePipeline::new(
            self.preprocessor
                .unwrap_or_else(|| Box::new(BoxBlurPreprocessor::default())),
            self.segmenter
                .unwrap_or_else(|| Box::new(HsvRangeSegmenter::default())),
            self.filter
                .unwrap_or_else(|| Box::new(ErodeDilateFilter::default())),
            self.extractor
                .unwrap_or_else(|| Box::new(TwoLevelContourExtractor)),
            self.renderer
                .unwrap_or_else(|| Box::new(OutlineRenderer::default())),
            self.snapshots,
        )
    }
}
