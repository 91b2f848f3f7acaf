pub mod telemetry;

pub use telemetry::SessionTelemetry;

use crate::capture::{FrameCapture, SyntheticCapture};
use crate::config::SketchConfig;
use crate::export::{self, DrawingExport};
use crate::render::{FrameMailbox, FrameSnapshot, NullRenderBackend, Renderer};
use crate::scene::Scene;
use crate::session::{DrawingSession, SessionState, UiState};
use crate::stroke::StrokeColor;
use crate::tracking::{SimulatedTracking, TrackingSource, TrackingState};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    TouchBegan,
    TouchEnded,
    Reset,
    ColorChanged(StrokeColor),
    /// The view went off screen; tracking and drawing stop.
    Pause,
    Resume,
}

/// Drives a drawing session from serial input events and per-frame ticks.
pub struct SketchApp {
    session: DrawingSession,
    scene: Scene,
    tracking: Box<dyn TrackingSource>,
    capture: Box<dyn FrameCapture>,
    mailbox: FrameMailbox,
    renderer: Option<Renderer>,
    telemetry: SessionTelemetry,
    frame_index: u64,
    last_tracking: Option<TrackingState>,
    paused: bool,
    target_frame_time: f32,
}

impl SketchApp {
    /// Simulated tracking, synthetic capture and an in-process null renderer.
    pub fn new(config: SketchConfig) -> Self {
        Self::with_sources(
            config,
            Box::new(SimulatedTracking::default()),
            Box::new(SyntheticCapture::default()),
        )
    }

    pub fn with_sources(
        config: SketchConfig,
        tracking: Box<dyn TrackingSource>,
        capture: Box<dyn FrameCapture>,
    ) -> Self {
        let mailbox = FrameMailbox::new();
        let renderer = Renderer::new(Box::new(NullRenderBackend::default()), mailbox.clone());
        log::info!(
            "[app] tracking via {}, rendering via {}",
            tracking.label(),
            renderer.backend_label()
        );

        Self {
            session: DrawingSession::new(config),
            scene: Scene::new(),
            tracking,
            capture,
            mailbox,
            renderer: Some(renderer),
            telemetry: SessionTelemetry::default(),
            frame_index: 0,
            last_tracking: None,
            paused: false,
            target_frame_time: 1.0 / 60.0,
        }
    }

    /// Hands frame consumption to an external render thread. Frames keep being
    /// published to the returned mailbox.
    pub fn detach_renderer(&mut self) -> FrameMailbox {
        self.renderer = None;
        self.mailbox.clone()
    }

    pub fn handle_input(&mut self, event: InputEvent) -> UiState {
        match event {
            InputEvent::TouchBegan => {
                if self.paused {
                    log::debug!("[app] touch ignored while paused");
                } else {
                    let transition = self.session.touch_began(
                        self.tracking.as_ref(),
                        self.capture.as_mut(),
                        &mut self.scene,
                    );
                    if transition.stroke.is_some() {
                        self.telemetry.strokes_started += 1;
                    }
                }
            }
            InputEvent::TouchEnded => {
                self.session.touch_ended();
            }
            InputEvent::Reset => {
                self.session.reset(&mut self.scene);
                self.telemetry.resets += 1;
                self.publish_frame();
            }
            InputEvent::ColorChanged(color) => self.session.set_color(color),
            InputEvent::Pause => {
                if self.session.state() == SessionState::Drawing {
                    self.session.touch_ended();
                }
                self.paused = true;
                log::info!("[app] paused");
            }
            InputEvent::Resume => {
                self.paused = false;
                // re-announce the tracking state on the next tick
                self.last_tracking = None;
                log::info!("[app] resumed");
            }
        }
        self.session.ui().clone()
    }

    /// One rendered frame: sample tracking, extend the active stroke, publish.
    pub fn tick(&mut self, delta_seconds: f32) -> UiState {
        if self.paused {
            return self.session.ui().clone();
        }

        let start = Instant::now();
        if let Err(err) = self.tracking.advance(delta_seconds) {
            self.session.tracking_failed(&err);
        }

        let state = self.tracking.tracking_state();
        if self.last_tracking != Some(state) {
            log::info!("[app] tracking state: {state}");
            self.session.tracking_changed(&state.quality());
            self.last_tracking = Some(state);
        }

        if let Some(outcome) = self
            .session
            .frame_update(self.tracking.as_ref(), &mut self.scene)
        {
            self.telemetry.record_append(outcome);
        }

        let frame_ms = start.elapsed().as_secs_f32() * 1000.0;
        let budget_ms = self.session.config().frame_budget_ms;
        if self.telemetry.record_frame(frame_ms, budget_ms) {
            log::warn!(
                "[app] frame {} update took {frame_ms:.3} ms (budget {budget_ms:.1} ms)",
                self.frame_index
            );
        }

        self.publish_frame();
        self.session.ui().clone()
    }

    /// Ticks `frames` times using wall-clock deltas.
    pub fn run_frames(&mut self, frames: u32) -> UiState {
        let mut last_frame = Instant::now();
        for _ in 0..frames {
            let now = Instant::now();
            let raw_delta = now.duration_since(last_frame).as_secs_f32();
            let delta_seconds = if raw_delta == 0.0 {
                self.target_frame_time
            } else {
                raw_delta
            };
            last_frame = now;
            self.tick(delta_seconds);
        }
        self.session.ui().clone()
    }

    pub fn export(&self) -> DrawingExport {
        DrawingExport::from_accumulator(self.session.strokes())
    }

    /// Adds the exported strokes to the current drawing; returns how many.
    pub fn restore(&mut self, drawing: &DrawingExport) -> usize {
        let handles = export::restore_into(drawing, self.session.strokes_mut(), &mut self.scene);
        self.publish_frame();
        handles.len()
    }

    pub fn session(&self) -> &DrawingSession {
        &self.session
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn telemetry(&self) -> &SessionTelemetry {
        &self.telemetry
    }

    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn publish_frame(&mut self) {
        let snapshot = FrameSnapshot::capture(self.frame_index, &self.scene);
        self.frame_index += 1;
        if self.mailbox.publish(snapshot) {
            log::trace!("[app] render thread missed a frame");
        }

        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(err) = renderer.render_latest() {
                log::error!("[app] render error: {err}");
            }
        }
    }
}

impl Default for SketchApp {
    fn default() -> Self {
        Self::new(SketchConfig::default())
    }
}
