use serde::Serialize;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;
use tokio::task;
use tokio::time;
use tracing::{debug, info, warn};
use tracker::{Frame, FramePipeline};

use crate::{
    CaptureConfig, Result,
    sinks::FrameSink,
    sources::{FrameSource, FrameStream},
};

/// Per-tick frame processing driven by the [`Runner`].
pub trait FrameProcessor {
    /// `raw` is `None` on an empty tick; returns the frame to emit, if any.
    fn process(&mut self, raw: Option<Frame>, frame_index: u64) -> Option<Frame>;
}

impl FrameProcessor for FramePipeline {
    fn process(&mut self, raw: Option<Frame>, frame_index: u64) -> Option<Frame> {
        FramePipeline::process(self, raw, frame_index)
    }
}

/// Owns an open stream and releases it exactly once, on [`CaptureHandle::release`]
/// or on drop.
#[derive(Debug)]
pub struct CaptureHandle<S: FrameStream> {
    stream: Option<S>,
}

impl<S: FrameStream> CaptureHandle<S> {
    pub fn new(stream: S) -> Self {
        Self { stream: Some(stream) }
    }

    pub fn read(&mut self) -> Option<Frame> {
        self.stream.as_mut().and_then(|stream| stream.read())
    }

    pub fn release(mut self) {
        self.release_stream();
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
    }
}

impl<S: FrameStream> Drop for CaptureHandle<S> {
    fn drop(&mut self) {
        self.release_stream();
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub frames_produced: u64,
    pub empty_ticks: u64,
    pub frames_written: u64,
    pub sink_failures: u64,
    pub cancelled: bool,
}

/// Fixed-rate frame pump.
///
/// Ticks run one after another on a single task, so two `process` calls never
/// overlap; a late tick is coalesced or dropped according to
/// [`CaptureConfig::overrun`].
pub struct Runner<S: FrameSource> {
    source: S,
    sink: Option<Box<dyn FrameSink>>,
    config: CaptureConfig,
}

impl<S: FrameSource> Runner<S> {
    pub fn new(source: S, config: CaptureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            sink: None,
            config,
        })
    }

    pub fn with_sink<K>(mut self, sink: K) -> Self
    where
        K: FrameSink + 'static,
    {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn with_boxed_sink(mut self, sink: Option<Box<dyn FrameSink>>) -> Self {
        self.sink = sink;
        self
    }

    /// Get reference to the current source
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Open the source and pump frames through `processor` until the frame
    /// limit is reached or `shutdown` turns `true`.
    ///
    /// Only a failure to open the source is returned as an error.
    pub async fn run<P>(self, processor: &mut P, mut shutdown: watch::Receiver<bool>) -> Result<RunSummary>
    where
        P: FrameProcessor + ?Sized,
    {
        let Self { source, mut sink, config } = self;

        let mut handle = CaptureHandle::new(source.open()?);
        let sink_name = sink.as_ref().map_or_else(|| "none".to_string(), |s| s.description());
        info!(
            source = %source.description(),
            sink = %sink_name,
            interval_ms = config.tick_interval_ms,
            frame_limit = ?config.frame_limit,
            overrun = %config.overrun,
            "capture started"
        );

        let mut interval = time::interval(config.tick_interval());
        interval.set_missed_tick_behavior(config.overrun.into());

        let mut summary = RunSummary::default();
        let mut listening = true;

        loop {
            if config.frame_limit.is_some_and(|limit| summary.ticks >= limit) {
                break;
            }
            if *shutdown.borrow_and_update() {
                summary.cancelled = true;
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed(), if listening => {
                    // Sender gone: nobody can cancel anymore
                    if changed.is_err() {
                        listening = false;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            let tick = summary.ticks;
            summary.ticks += 1;

            let Some(frame) = off_reactor(|| processor.process(handle.read(), tick)) else {
                summary.empty_ticks += 1;
                continue;
            };
            summary.frames_produced += 1;

            if let Some(sink) = sink.as_mut() {
                match sink.write(&frame) {
                    Ok(()) => summary.frames_written += 1,
                    Err(err) => {
                        summary.sink_failures += 1;
                        warn!(tick, stage = "sink", error = %err, "failed to write frame");
                    }
                }
            }
        }

        handle.release();
        if let Some(sink) = sink {
            if let Err(err) = sink.release() {
                summary.sink_failures += 1;
                warn!(stage = "sink", error = %err, "failed to finalize recording");
            }
        }

        debug!(?summary, "capture stopped");
        Ok(summary)
    }
}

/// Runs frame work in place of the async task so other tasks keep their worker.
/// A current-thread runtime has no other worker to hand them to.
fn off_reactor<R>(work: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => task::block_in_place(work),
        _ => work(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaptureError, OverrunPolicy, sinks::SinkError};
    use image::Rgb;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, Clone, Default)]
    struct FakeSource {
        /// `None` entries are empty ticks
        frames: Vec<Option<u8>>,
        unavailable: bool,
        releases: Arc<AtomicUsize>,
    }

    struct FakeStream {
        frames: std::vec::IntoIter<Option<u8>>,
        releases: Arc<AtomicUsize>,
    }

    impl FrameSource for FakeSource {
        type Stream = FakeStream;

        fn open(&self) -> Result<FakeStream> {
            if self.unavailable {
                return Err(CaptureError::DeviceUnavailable {
                    device: self.description(),
                    reason: "unplugged".into(),
                });
            }
            Ok(FakeStream {
                frames: self.frames.clone().into_iter(),
                releases: Arc::clone(&self.releases),
            })
        }

        fn description(&self) -> String {
            "fake".into()
        }
    }

    impl FrameStream for FakeStream {
        fn read(&mut self) -> Option<Frame> {
            self.frames
                .next()
                .flatten()
                .map(|shade| Frame::from_pixel(2, 2, Rgb([shade, shade, shade])))
        }

        fn release(self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Passes frames through and records when each tick ran.
    #[derive(Default)]
    struct Recorder {
        ticks: Vec<(u64, Instant, bool)>,
    }

    impl FrameProcessor for Recorder {
        fn process(&mut self, raw: Option<Frame>, frame_index: u64) -> Option<Frame> {
            self.ticks.push((frame_index, Instant::now(), raw.is_some()));
            raw
        }
    }

    #[derive(Clone, Default)]
    struct MemorySink {
        frames: Arc<Mutex<Vec<Frame>>>,
        released: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FrameSink for MemorySink {
        fn write(&mut self, frame: &Frame) -> std::result::Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Io(std::io::Error::other("disk full")));
            }
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn release(self: Box<Self>) -> std::result::Result<(), SinkError> {
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn description(&self) -> String {
            "memory".into()
        }
    }

    fn source_with(frames: Vec<Option<u8>>) -> FakeSource {
        FakeSource { frames, ..Default::default() }
    }

    fn bounded(limit: u64) -> CaptureConfig {
        CaptureConfig { frame_limit: Some(limit), ..Default::default() }
    }

    fn channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_run_records_frames() {
        let source = source_with(vec![Some(1), Some(2), Some(3), Some(4)]);
        let releases = Arc::clone(&source.releases);
        let sink = MemorySink::default();
        let (_tx, rx) = channel();

        let mut recorder = Recorder::default();
        let summary = Runner::new(source, bounded(3))
            .unwrap()
            .with_sink(sink.clone())
            .run(&mut recorder, rx)
            .await
            .unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.frames_produced, 3);
        assert_eq!(summary.frames_written, 3);
        assert!(!summary.cancelled);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(sink.released.load(Ordering::SeqCst), 1);

        let shades: Vec<u8> = sink.frames.lock().unwrap().iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert_eq!(shades, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_fixed_interval() {
        let source = source_with(vec![Some(1); 4]);
        let (_tx, rx) = channel();
        let mut recorder = Recorder::default();

        let start = Instant::now();
        Runner::new(source, bounded(4)).unwrap().run(&mut recorder, rx).await.unwrap();

        let offsets: Vec<Duration> = recorder.ticks.iter().map(|(_, at, _)| *at - start).collect();
        let expected: Vec<Duration> = (0..4).map(|i| Duration::from_millis(33 * i)).collect();
        assert_eq!(offsets, expected);

        let indices: Vec<u64> = recorder.ticks.iter().map(|(i, _, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_ticks_count_toward_limit() {
        let source = source_with(vec![Some(1), None, Some(3)]);
        let sink = MemorySink::default();
        let (_tx, rx) = channel();
        let mut recorder = Recorder::default();

        let summary = Runner::new(source, bounded(5))
            .unwrap()
            .with_sink(sink.clone())
            .run(&mut recorder, rx)
            .await
            .unwrap();

        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.frames_produced, 2);
        assert_eq!(summary.empty_ticks, 3);
        assert_eq!(sink.frames.lock().unwrap().len(), 2);
        assert_eq!(
            recorder.ticks.iter().map(|(_, _, got)| *got).collect::<Vec<_>>(),
            vec![true, false, true, false, false]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_device_fails_before_ticks() {
        let source = FakeSource { unavailable: true, ..Default::default() };
        let releases = Arc::clone(&source.releases);
        let (_tx, rx) = channel();
        let mut recorder = Recorder::default();

        let err = Runner::new(source, bounded(3))
            .unwrap()
            .run(&mut recorder, rx)
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::DeviceUnavailable { .. }));
        assert!(recorder.ticks.is_empty());
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failures_do_not_stop_capture() {
        let source = source_with(vec![Some(1); 3]);
        let sink = MemorySink { fail: true, ..Default::default() };
        let (_tx, rx) = channel();
        let mut recorder = Recorder::default();

        let summary = Runner::new(source, bounded(3))
            .unwrap()
            .with_sink(sink.clone())
            .run(&mut recorder, rx)
            .await
            .unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.frames_written, 0);
        assert_eq!(summary.sink_failures, 3);
        assert_eq!(sink.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_continuous_capture() {
        let source = FakeSource { frames: vec![Some(1); 1000], ..Default::default() };
        let releases = Arc::clone(&source.releases);
        let config = CaptureConfig { frame_limit: None, ..Default::default() };
        let (tx, rx) = channel();

        tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            tx.send(true).unwrap();
        });

        let mut recorder = Recorder::default();
        let summary = Runner::new(source, config).unwrap().run(&mut recorder, rx).await.unwrap();

        assert!(summary.cancelled);
        assert!(summary.ticks >= 3 && summary.ticks <= 5, "ticks = {}", summary.ticks);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_start_runs_no_ticks() {
        let source = source_with(vec![Some(1); 3]);
        let releases = Arc::clone(&source.releases);
        let (tx, rx) = channel();
        tx.send(true).unwrap();

        let mut recorder = Recorder::default();
        let summary = Runner::new(source, bounded(3)).unwrap().run(&mut recorder, rx).await.unwrap();

        assert_eq!(summary.ticks, 0);
        assert!(summary.cancelled);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_keeps_running() {
        let source = source_with(vec![Some(1); 3]);
        let (tx, rx) = channel();
        drop(tx);

        let mut recorder = Recorder::default();
        let summary = Runner::new(source, bounded(3)).unwrap().run(&mut recorder, rx).await.unwrap();
        assert_eq!(summary.ticks, 3);
        assert!(!summary.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_real_pipeline() {
        let source = source_with(vec![Some(200), None]);
        let (_tx, rx) = channel();

        let mut pipeline = FramePipeline::builder().build();
        let summary = Runner::new(source, CaptureConfig { overrun: OverrunPolicy::Skip, ..bounded(2) })
            .unwrap()
            .run(&mut pipeline, rx)
            .await
            .unwrap();

        assert_eq!(summary.frames_produced, 1);
        assert_eq!(summary.empty_ticks, 1);
        assert_eq!(pipeline.points().frames(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runs_on_multi_thread_runtime() {
        let source = source_with(vec![Some(200), Some(7), None]);
        let releases = Arc::clone(&source.releases);
        let (_tx, rx) = channel();
        let config = CaptureConfig { tick_interval_ms: 1, ..bounded(3) };

        let mut pipeline = FramePipeline::builder().build();
        let summary = Runner::new(source, config).unwrap().run(&mut pipeline, rx).await.unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.frames_produced, 2);
        assert_eq!(summary.empty_ticks, 1);
        assert_eq!(pipeline.points().frames(), 2);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let stream = || FakeStream { frames: Vec::new().into_iter(), releases: Arc::clone(&releases) };

        CaptureHandle::new(stream()).release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        drop(CaptureHandle::new(stream()));
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }
}
