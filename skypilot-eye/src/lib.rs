//! skypilot-eye: video for SkyPilot
//!
//! Turns the vehicle's video into something people can watch and the
//! vehicle can follow:
//! - Raw frame sources and the external transcoder process
//! - Face detection capability and the dead-band face tracker
//! - Annotation, JPEG encoding and snapshots
//! - Fan-out of encoded frames to any number of viewers

pub mod config;
pub mod error;
pub mod frame;
pub mod source;
pub mod transcoder;
pub mod detector;
pub mod tracker;
pub mod annotate;
pub mod snapshot;
pub mod broadcast;
pub mod pipeline;

pub use config::TranscoderConfig;
pub use error::VisionError;
pub use frame::{
    BoundingBox, DetectionResult, Frame, FRAME_AREA, FRAME_CENTER_X, FRAME_CENTER_Y,
    FRAME_HEIGHT, FRAME_SIZE, FRAME_WIDTH,
};
pub use source::{FrameSource, RawStreamSource};
pub use transcoder::{PacketSink, Transcoder};
pub use detector::{FaceDetector, NullDetector};
pub use tracker::{corrections, measure, track, FaceOffset};
pub use annotate::{annotate_face, encode_jpeg};
pub use snapshot::SnapshotWriter;
pub use broadcast::{FrameBroadcaster, FrameSubscription};
pub use pipeline::{FramePipeline, PipelineStats};
