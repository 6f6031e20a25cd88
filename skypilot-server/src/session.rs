//! Pilot session
//!
//! Owns everything attached to one vehicle: the link, shared state, patrol,
//! dispatcher, frame pipeline and the tasks reacting to link events.
//!
//! On `Connected` the session asks for video, keeps re-asking on a short
//! interval (the vehicle stops streaming otherwise), starts the transcoder
//! and pipeline, then reports `Streaming`. Video packets are fed to the
//! transcoder as they arrive.

use parking_lot::Mutex;
use serde::Serialize;
use skypilot_core::{
    LinkEvent, LinkHandle, LinkLifecycle, LinkState, PilotConfig, PilotError, VehicleState,
    VideoCommand,
};
use skypilot_ctl::{CommandDispatcher, DispatchOutcome, PatrolController, PatrolStats};
use skypilot_eye::{
    FaceDetector, FrameBroadcaster, FramePipeline, FrameSource, PacketSink, PipelineStats,
    Transcoder, TranscoderConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Exposure compensation requested on connect
const DEFAULT_EXPOSURE: i8 = 0;

#[derive(Default)]
struct SessionTasks {
    events: Option<JoinHandle<()>>,
    keepalive: Option<JoinHandle<()>>,
    pipeline: Option<JoinHandle<()>>,
    transcoder: Option<Transcoder>,
}

/// Point-in-time view of the session, served by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub link: String,
    pub state: LinkState,
    pub speed: u8,
    pub patrolling: bool,
    pub face_tracking: bool,
    pub viewers: usize,
    pub patrol: PatrolStats,
    pub pipeline: PipelineStats,
}

pub struct PilotSession {
    id: Uuid,
    link: LinkHandle,
    state: Arc<VehicleState>,
    lifecycle: LinkLifecycle,
    patrol: Arc<PatrolController>,
    dispatcher: CommandDispatcher,
    pipeline: Arc<FramePipeline>,
    config: PilotConfig,
    transcoder: TranscoderConfig,
    video_enabled: bool,
    tasks: Mutex<SessionTasks>,
}

impl PilotSession {
    pub fn new(
        link: LinkHandle,
        detector: Arc<dyn FaceDetector>,
        config: PilotConfig,
        transcoder: TranscoderConfig,
        video_enabled: bool,
    ) -> Arc<Self> {
        let state = Arc::new(VehicleState::new());
        let patrol = Arc::new(PatrolController::new(
            link.clone(),
            state.clone(),
            config.patrol_interval(),
        ));
        let dispatcher = CommandDispatcher::new(
            link.clone(),
            state.clone(),
            patrol.clone(),
            config.snapshot_timeout(),
        );
        let pipeline = Arc::new(FramePipeline::new(
            link.clone(),
            state.clone(),
            patrol.clone(),
            detector,
            FrameBroadcaster::new(config.broadcast_capacity),
            &config,
        ));

        let id = Uuid::new_v4();
        info!("session {} created for link {}", id, link.name());

        Arc::new(Self {
            id,
            link,
            state,
            lifecycle: LinkLifecycle::new(),
            patrol,
            dispatcher,
            pipeline,
            config,
            transcoder,
            video_enabled,
            tasks: Mutex::new(SessionTasks::default()),
        })
    }

    /// Start reacting to link events. Calling it again has no effect.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock();
        if tasks.events.is_some() {
            return;
        }
        // Subscribe before spawning so an immediate Connected is not missed
        let events = self.link.subscribe();
        tasks.events = Some(tokio::spawn(self.clone().pump_events(events)));
    }

    async fn pump_events(self: Arc<Self>, mut events: tokio::sync::broadcast::Receiver<LinkEvent>) {
        let mut sink: Option<PacketSink> = None;

        loop {
            match events.recv().await {
                Ok(LinkEvent::Connected) => {
                    if let Some(new_sink) = self.on_connected().await {
                        sink = Some(new_sink);
                    }
                }
                Ok(LinkEvent::VideoPacket(packet)) => {
                    if let Some(sink) = sink.as_mut() {
                        if let Err(e) = sink.write_packet(&packet).await {
                            warn!("failed to feed transcoder: {}", e);
                        }
                    }
                }
                Ok(LinkEvent::Disconnected) => self.on_disconnected(),
                Err(RecvError::Lagged(n)) => warn!("session lagged, {} link events lost", n),
                Err(RecvError::Closed) => {
                    info!("link event stream closed");
                    break;
                }
            }
        }
    }

    /// Returns a new packet sink when this connect started the transcoder
    async fn on_connected(&self) -> Option<PacketSink> {
        if let Err(e) = self.lifecycle.transition(LinkState::Connected) {
            warn!("ignoring connect: {}", e);
            return None;
        }

        self.link.video(VideoCommand::Start).await;
        self.link.video(VideoCommand::EncoderRateAuto).await;
        self.link.video(VideoCommand::Exposure(DEFAULT_EXPOSURE)).await;
        self.spawn_keepalive();

        let sink = if self.video_enabled {
            self.start_transcoder()
        } else {
            None
        };

        if let Err(e) = self.lifecycle.transition(LinkState::Streaming) {
            warn!("not streaming: {}", e);
        }
        sink
    }

    fn on_disconnected(&self) {
        if let Some(keepalive) = self.tasks.lock().keepalive.take() {
            keepalive.abort();
        }
        match self.lifecycle.transition(LinkState::Disconnected) {
            Ok(_) => warn!("vehicle disconnected"),
            Err(e) => debug!("ignoring disconnect: {}", e),
        }
    }

    fn spawn_keepalive(&self) {
        let link = self.link.clone();
        let every = self.config.video_keepalive();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                link.video(VideoCommand::Start).await;
            }
        });

        if let Some(previous) = self.tasks.lock().keepalive.replace(handle) {
            previous.abort();
        }
    }

    fn start_transcoder(&self) -> Option<PacketSink> {
        if self.tasks.lock().transcoder.is_some() {
            debug!("transcoder already running");
            return None;
        }

        match Transcoder::spawn(&self.transcoder) {
            Ok((transcoder, sink, source)) => {
                self.tasks.lock().transcoder = Some(transcoder);
                self.attach_source(source);
                Some(sink)
            }
            Err(e) => {
                error!("video pipeline not started: {}", e);
                None
            }
        }
    }

    /// Run the frame pipeline on `source`, replacing any running one
    pub fn attach_source<S>(&self, source: S)
    where
        S: FrameSource + 'static,
    {
        let handle = self.pipeline.clone().spawn(source);
        if let Some(previous) = self.tasks.lock().pipeline.replace(handle) {
            previous.abort();
        }
    }

    pub async fn dispatch(&self, command: &str, param: Option<&str>) -> DispatchOutcome {
        self.dispatcher.dispatch(command, param).await
    }

    /// Wait for the vehicle to connect, up to the configured readiness timeout
    pub async fn wait_ready(&self) -> Result<(), PilotError> {
        self.lifecycle.wait_ready(self.config.ready_timeout()).await
    }

    pub async fn wait_until(&self, target: LinkState, timeout: Duration) -> Result<(), PilotError> {
        self.lifecycle.wait_until(target, timeout).await
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn link_state(&self) -> LinkState {
        self.lifecycle.state()
    }

    pub fn state(&self) -> &Arc<VehicleState> {
        &self.state
    }

    pub fn patrol(&self) -> &Arc<PatrolController> {
        &self.patrol
    }

    pub fn pipeline(&self) -> &Arc<FramePipeline> {
        &self.pipeline
    }

    pub fn broadcaster(&self) -> &FrameBroadcaster {
        self.pipeline.broadcaster()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id,
            link: self.link.name().to_string(),
            state: self.lifecycle.state(),
            speed: self.state.speed(),
            patrolling: self.state.is_patrolling(),
            face_tracking: self.state.is_face_tracking(),
            viewers: self.broadcaster().subscriber_count(),
            patrol: self.patrol.stats(),
            pipeline: self.pipeline.stats(),
        }
    }

    /// Stop patrol, every session task and the transcoder
    pub async fn shutdown(&self) {
        self.patrol.stop();

        let transcoder = {
            let mut tasks = self.tasks.lock();
            for handle in [
                tasks.events.take(),
                tasks.keepalive.take(),
                tasks.pipeline.take(),
            ]
            .into_iter()
            .flatten()
            {
                handle.abort();
            }
            tasks.transcoder.take()
        };

        if let Some(mut transcoder) = transcoder {
            transcoder.kill().await;
        }
        let _ = self.lifecycle.transition(LinkState::Disconnected);
        info!("session {} shut down", self.id);
    }
}
