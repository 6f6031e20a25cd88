//! Frame pipeline
//!
//! One long-lived task per session. Per frame, in this order:
//! face tracking (detection, annotation, corrective moves), JPEG encoding,
//! the pending snapshot if any, then fan-out to viewers.

use crate::annotate::{annotate_face, encode_jpeg};
use crate::broadcast::FrameBroadcaster;
use crate::detector::FaceDetector;
use crate::error::VisionError;
use crate::frame::{Frame, FRAME_SIZE};
use crate::snapshot::SnapshotWriter;
use crate::source::FrameSource;
use crate::tracker::track;
use bytes::Bytes;
use metrics::{counter, gauge};
use serde::Serialize;
use skypilot_core::{LinkHandle, PilotConfig, VehicleState};
use skypilot_ctl::PatrolController;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub frames_read: u64,
    pub failed_reads: u64,
    pub invalid_frames: u64,
    pub faces_tracked: u64,
    pub frames_published: u64,
    pub snapshots_written: u64,
}

#[derive(Default)]
struct Counters {
    frames_read: AtomicU64,
    failed_reads: AtomicU64,
    invalid_frames: AtomicU64,
    faces_tracked: AtomicU64,
    frames_published: AtomicU64,
    snapshots_written: AtomicU64,
}

pub struct FramePipeline {
    link: LinkHandle,
    state: Arc<VehicleState>,
    patrol: Arc<PatrolController>,
    detector: Arc<dyn FaceDetector>,
    broadcaster: FrameBroadcaster,
    snapshots: SnapshotWriter,
    jpeg_quality: u8,
    retry_delay: Duration,
    counters: Counters,
}

impl FramePipeline {
    pub fn new(
        link: LinkHandle,
        state: Arc<VehicleState>,
        patrol: Arc<PatrolController>,
        detector: Arc<dyn FaceDetector>,
        broadcaster: FrameBroadcaster,
        config: &PilotConfig,
    ) -> Self {
        Self {
            link,
            state,
            patrol,
            detector,
            broadcaster,
            snapshots: SnapshotWriter::new(config.snapshot_dir.clone()),
            jpeg_quality: config.jpeg_quality,
            retry_delay: config.read_retry_delay(),
            counters: Counters::default(),
        }
    }

    /// Run the pipeline on its own task until aborted
    pub fn spawn<S>(self: Arc<Self>, source: S) -> JoinHandle<()>
    where
        S: FrameSource + 'static,
    {
        tokio::spawn(async move { self.run(source).await })
    }

    /// Read and process frames forever. Failed reads are logged and retried
    /// after a short delay; they never end the loop.
    pub async fn run<S: FrameSource>(&self, mut source: S) {
        info!("frame pipeline started");
        let mut buf = vec![0u8; FRAME_SIZE];

        loop {
            if let Err(e) = source.read_frame(&mut buf).await {
                self.counters.failed_reads.fetch_add(1, Ordering::Relaxed);
                counter!("skypilot_frame_read_failures_total").increment(1);
                warn!("frame read failed: {}", e);
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }
            self.counters.frames_read.fetch_add(1, Ordering::Relaxed);
            counter!("skypilot_frames_read_total").increment(1);

            let raw = std::mem::replace(&mut buf, vec![0u8; FRAME_SIZE]);
            if let Err(e) = self.process_frame(raw).await {
                error!("frame dropped: {}", e);
            }
        }
    }

    /// Process one raw frame. Returns the published JPEG, or `None` when the
    /// bytes do not form a frame.
    pub async fn process_frame(&self, raw: Vec<u8>) -> Result<Option<Bytes>, VisionError> {
        let Some(mut frame) = Frame::from_bgr(raw) else {
            self.counters.invalid_frames.fetch_add(1, Ordering::Relaxed);
            counter!("skypilot_invalid_frames_total").increment(1);
            debug!("skipping invalid frame");
            return Ok(None);
        };

        if self.state.is_face_tracking() {
            self.track_faces(&mut frame).await;
        }

        let jpeg = Bytes::from(encode_jpeg(&frame, self.jpeg_quality)?);

        if self.state.snapshot_requested() {
            self.save_snapshot(&jpeg).await;
        }

        self.counters.frames_published.fetch_add(1, Ordering::Relaxed);
        counter!("skypilot_frames_published_total").increment(1);
        let viewers = self.broadcaster.publish(jpeg.clone());
        gauge!("skypilot_viewers").set(viewers as f64);
        Ok(Some(jpeg))
    }

    async fn track_faces(&self, frame: &mut Frame) {
        // Tracking and patrol both steer the vehicle; tracking wins
        if self.patrol.stop() {
            info!("patrol stopped by face tracking");
        }

        let faces = match self.detector.detect(frame).await {
            Ok(faces) => faces,
            Err(e) => {
                warn!("face detection failed: {}", e);
                return;
            }
        };

        // Only the first face is followed
        match faces.first() {
            None => {
                self.link.hover().await;
            }
            Some(face) => {
                annotate_face(frame, face);
                for maneuver in track(face) {
                    self.link.issue(maneuver).await;
                }
                self.counters.faces_tracked.fetch_add(1, Ordering::Relaxed);
                counter!("skypilot_faces_tracked_total").increment(1);
            }
        }
    }

    async fn save_snapshot(&self, jpeg: &[u8]) {
        match self.snapshots.write(jpeg).await {
            Ok(_) => {
                self.counters.snapshots_written.fetch_add(1, Ordering::Relaxed);
                counter!("skypilot_snapshots_written_total").increment(1);
            }
            Err(e) => error!("snapshot failed: {}", e),
        }
        // Cleared on failure too
        self.state.complete_snapshot();
    }

    pub fn broadcaster(&self) -> &FrameBroadcaster {
        &self.broadcaster
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            frames_read: self.counters.frames_read.load(Ordering::Relaxed),
            failed_reads: self.counters.failed_reads.load(Ordering::Relaxed),
            invalid_frames: self.counters.invalid_frames.load(Ordering::Relaxed),
            faces_tracked: self.counters.faces_tracked.load(Ordering::Relaxed),
            frames_published: self.counters.frames_published.load(Ordering::Relaxed),
            snapshots_written: self.counters.snapshots_written.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::MockFaceDetector;
    use crate::frame::{BoundingBox, FRAME_CENTER_X, FRAME_CENTER_Y};
    use skypilot_core::{Direction, Maneuver, RecordingLink};

    struct Harness {
        link: Arc<RecordingLink>,
        state: Arc<VehicleState>,
        patrol: Arc<PatrolController>,
        pipeline: FramePipeline,
        dir: tempfile::TempDir,
    }

    fn harness(detector: MockFaceDetector) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let link = Arc::new(RecordingLink::new());
        let handle = LinkHandle::new(link.clone());
        let state = Arc::new(VehicleState::new());
        let patrol = Arc::new(PatrolController::new(
            handle.clone(),
            state.clone(),
            Duration::from_secs(3),
        ));
        let config = PilotConfig {
            snapshot_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let pipeline = FramePipeline::new(
            handle,
            state.clone(),
            patrol.clone(),
            Arc::new(detector),
            FrameBroadcaster::new(4),
            &config,
        );
        Harness {
            link,
            state,
            patrol,
            pipeline,
            dir,
        }
    }

    fn raw_frame() -> Vec<u8> {
        vec![0; FRAME_SIZE]
    }

    #[tokio::test]
    async fn test_invalid_frame_skipped() {
        let h = harness(MockFaceDetector::new());
        let mut viewer = h.pipeline.broadcaster().subscribe();

        assert!(h.pipeline.process_frame(vec![0; 10]).await.unwrap().is_none());
        assert_eq!(h.pipeline.stats().invalid_frames, 1);

        h.pipeline.process_frame(raw_frame()).await.unwrap();
        let jpeg = viewer.next().await.unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_detector_unused_when_tracking_off() {
        let mut detector = MockFaceDetector::new();
        detector.expect_detect().never();
        let h = harness(detector);

        h.pipeline.process_frame(raw_frame()).await.unwrap();
        assert!(h.link.maneuvers().is_empty());
    }

    #[tokio::test]
    async fn test_no_face_hovers() {
        let mut detector = MockFaceDetector::new();
        detector.expect_detect().times(1).returning(|_| Ok(vec![]));
        let h = harness(detector);
        h.state.set_face_tracking(true);

        h.pipeline.process_frame(raw_frame()).await.unwrap();
        assert_eq!(h.link.maneuvers(), vec![Maneuver::Hover]);
    }

    #[tokio::test]
    async fn test_only_first_face_followed() {
        let mut detector = MockFaceDetector::new();
        detector.expect_detect().returning(|_| {
            Ok(vec![
                // Right of center, framed otherwise
                BoundingBox::centered(FRAME_CENTER_X + 40, FRAME_CENTER_Y, 60, 60),
                // Far left and huge: would add more moves if it were followed
                BoundingBox::new(0, 0, 100, 200),
            ])
        });
        let h = harness(detector);
        h.state.set_face_tracking(true);

        h.pipeline.process_frame(raw_frame()).await.unwrap();
        assert_eq!(
            h.link.maneuvers(),
            vec![Maneuver::moving(Direction::Right, 15)]
        );
        assert_eq!(h.pipeline.stats().faces_tracked, 1);
    }

    #[tokio::test]
    async fn test_tracking_stops_patrol() {
        let mut detector = MockFaceDetector::new();
        detector.expect_detect().returning(|_| Ok(vec![]));
        let h = harness(detector);

        assert!(h.patrol.start());
        h.state.set_face_tracking(true);
        h.pipeline.process_frame(raw_frame()).await.unwrap();

        assert!(!h.state.is_patrolling());
        while h.patrol.is_running() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_detection_error_is_not_fatal() {
        let mut detector = MockFaceDetector::new();
        detector
            .expect_detect()
            .returning(|_| Err(VisionError::Detection("classifier unavailable".to_string())));
        let h = harness(detector);
        h.state.set_face_tracking(true);

        let jpeg = h.pipeline.process_frame(raw_frame()).await.unwrap();
        assert!(jpeg.is_some());
        assert!(h.link.maneuvers().is_empty());
    }

    #[tokio::test]
    async fn test_pending_snapshot_written_once() {
        let h = harness(MockFaceDetector::new());

        let state = h.state.clone();
        let waiter = tokio::spawn(async move { state.take_snapshot(Duration::from_secs(2)).await });
        while !h.state.snapshot_requested() {
            tokio::task::yield_now().await;
        }

        h.pipeline.process_frame(raw_frame()).await.unwrap();
        h.pipeline.process_frame(raw_frame()).await.unwrap();

        assert!(waiter.await.unwrap());
        assert!(!h.state.snapshot_requested());
        assert_eq!(h.pipeline.stats().snapshots_written, 1);
        assert!(h.dir.path().join("snapshot.jpg").exists());
    }

    #[derive(Default)]
    struct CapturingRecorder {
        values: std::sync::Mutex<std::collections::HashMap<String, Arc<AtomicU64>>>,
    }

    impl CapturingRecorder {
        fn slot(&self, key: &metrics::Key) -> Arc<AtomicU64> {
            self.values
                .lock()
                .unwrap()
                .entry(key.name().to_string())
                .or_default()
                .clone()
        }

        fn raw(&self, name: &str) -> Option<u64> {
            self.values
                .lock()
                .unwrap()
                .get(name)
                .map(|v| v.load(Ordering::Relaxed))
        }
    }

    impl metrics::Recorder for CapturingRecorder {
        fn describe_counter(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}
        fn describe_gauge(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}
        fn describe_histogram(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}

        fn register_counter(&self, key: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Counter {
            metrics::Counter::from_arc(self.slot(key))
        }

        fn register_gauge(&self, key: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Gauge {
            metrics::Gauge::from_arc(self.slot(key))
        }

        fn register_histogram(&self, _: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Histogram {
            metrics::Histogram::noop()
        }
    }

    #[test]
    fn test_frame_counters_are_exported() {
        let recorder = CapturingRecorder::default();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let h = harness(MockFaceDetector::new());
        let _viewer = h.pipeline.broadcaster().subscribe();

        metrics::with_local_recorder(&recorder, || {
            rt.block_on(async {
                h.pipeline.process_frame(vec![0; 10]).await.unwrap();
                h.pipeline.process_frame(raw_frame()).await.unwrap();
            })
        });

        assert_eq!(recorder.raw("skypilot_invalid_frames_total"), Some(1));
        assert_eq!(recorder.raw("skypilot_frames_published_total"), Some(1));
        assert_eq!(
            recorder.raw("skypilot_viewers").map(f64::from_bits),
            Some(1.0)
        );
        assert_eq!(h.pipeline.stats().frames_published, 1);
    }
}
