use crate::capture::{FrameCapture, ImagePlane};
use crate::config::SketchConfig;
use crate::scene::{NodeId, Renderable, SceneSink};
use crate::stroke::{AppendOutcome, StrokeAccumulator, StrokeColor, StrokeHandle};
use crate::tracking::{TrackingError, TrackingQuality, TrackingSource};
use std::sync::Arc;

pub const STATUS_WAIT: &str = "Wait...";
pub const STATUS_READY: &str = "Touch the screen to draw.";
pub const STATUS_DRAWING: &str = "Move your device!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Drawing,
}

/// What the UI layer should display. Returned from every transition; the
/// session never touches widgets itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub status_text: String,
    pub show_pen: bool,
}

impl UiState {
    fn new(status_text: impl Into<String>, show_pen: bool) -> Self {
        Self {
            status_text: status_text.into(),
            show_pen,
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new(STATUS_WAIT, false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    TrackingNotReady { reason: String },
    AlreadyDrawing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTransition {
    pub state: SessionState,
    pub ui: UiState,
    /// Stroke begun or ended by this transition.
    pub stroke: Option<StrokeHandle>,
    pub refused: Option<Refusal>,
}

/// Sequences touch interactions against the stroke accumulator.
pub struct DrawingSession {
    config: SketchConfig,
    state: SessionState,
    strokes: StrokeAccumulator,
    image_planes: Vec<NodeId>,
    color: StrokeColor,
    active: Option<StrokeHandle>,
    tracking_status: String,
    ui: UiState,
}

impl DrawingSession {
    pub fn new(config: SketchConfig) -> Self {
        Self {
            strokes: StrokeAccumulator::new(config.stroke_policy()),
            color: config.default_color,
            config,
            state: SessionState::Idle,
            image_planes: Vec::new(),
            active: None,
            tracking_status: STATUS_WAIT.to_string(),
            ui: UiState::default(),
        }
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn strokes(&self) -> &StrokeAccumulator {
        &self.strokes
    }

    pub fn strokes_mut(&mut self) -> &mut StrokeAccumulator {
        &mut self.strokes
    }

    pub fn image_planes(&self) -> &[NodeId] {
        &self.image_planes
    }

    pub fn color(&self) -> StrokeColor {
        self.color
    }

    /// Pen color for strokes begun after this call.
    pub fn set_color(&mut self, color: StrokeColor) {
        self.color = color;
    }

    pub fn touch_began(
        &mut self,
        tracking: &dyn TrackingSource,
        capture: &mut dyn FrameCapture,
        scene: &mut dyn SceneSink,
    ) -> SessionTransition {
        if self.state == SessionState::Drawing {
            return self.refuse(Refusal::AlreadyDrawing);
        }
        if let TrackingQuality::NotReady { reason } = tracking.quality() {
            log::debug!("[session] touch ignored, tracking not ready: {reason}");
            return self.refuse(Refusal::TrackingNotReady { reason });
        }

        let center = tracking.viewport_center(self.config.center_depth);
        if self.config.capture_on_touch {
            self.stamp_image_plane(capture, scene, center);
        }

        self.strokes.set_viewer(tracking.camera_pose().position);
        let handle = self
            .strokes
            .begin_stroke(scene, self.color, self.config.stroke_width);
        self.active = Some(handle);
        self.state = SessionState::Drawing;
        self.ui = UiState::new(STATUS_DRAWING, true);
        log::debug!("[session] drawing {handle}");
        self.transition(Some(handle))
    }

    /// Per-frame callback: appends the viewport-center point while drawing.
    pub fn frame_update(
        &mut self,
        tracking: &dyn TrackingSource,
        scene: &mut dyn SceneSink,
    ) -> Option<AppendOutcome> {
        let handle = self.active?;
        self.strokes.set_viewer(tracking.camera_pose().position);
        let point = tracking.viewport_center(self.config.center_depth);
        match self.strokes.append_point(scene, handle, point) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                log::warn!("[session] dropping active stroke: {err}");
                self.active = None;
                self.state = SessionState::Idle;
                self.ui.show_pen = false;
                None
            }
        }
    }

    pub fn touch_ended(&mut self) -> SessionTransition {
        let ended = self.active.take();
        if let Some(handle) = ended {
            if let Err(err) = self.strokes.end_stroke(handle) {
                log::warn!("[session] could not finalize stroke: {err}");
            }
        }
        self.state = SessionState::Idle;
        self.ui = UiState::new(self.tracking_status.clone(), false);
        self.transition(ended)
    }

    /// Updates the status line for a tracking-state change. Strokes already in
    /// progress keep drawing; readiness only gates new strokes.
    pub fn tracking_changed(&mut self, quality: &TrackingQuality) -> UiState {
        self.tracking_status = match quality {
            TrackingQuality::Ready => STATUS_READY.to_string(),
            TrackingQuality::NotReady { reason } => format!("Wait. {reason}"),
        };
        let drawing_and_ready = self.state == SessionState::Drawing && quality.is_ready();
        self.ui.status_text = if drawing_and_ready {
            STATUS_DRAWING.to_string()
        } else {
            self.tracking_status.clone()
        };
        self.ui.clone()
    }

    pub fn tracking_failed(&mut self, err: &TrackingError) -> UiState {
        log::error!("[session] tracking session failed: {err}");
        self.tracking_status = format!("Wait. {err}");
        self.ui.status_text = self.tracking_status.clone();
        self.ui.clone()
    }

    /// Removes every stroke and image plane from the scene. Valid in any state.
    pub fn reset(&mut self, scene: &mut dyn SceneSink) -> SessionTransition {
        let discarded = self.strokes.reset_all(scene);
        for node in self.image_planes.drain(..) {
            if let Err(err) = scene.remove_node(node) {
                log::warn!("[session] image plane already detached: {err}");
            }
        }
        log::info!("[session] reset discarded {discarded} strokes");

        self.active = None;
        self.state = SessionState::Idle;
        self.ui = UiState::new(self.tracking_status.clone(), false);
        self.transition(None)
    }

    fn stamp_image_plane(
        &mut self,
        capture: &mut dyn FrameCapture,
        scene: &mut dyn SceneSink,
        center: glam::Vec3,
    ) {
        let Some(frame) = capture.capture_still() else {
            log::debug!("[session] no camera frame available; skipping image plane");
            return;
        };
        match ImagePlane::from_frame(frame, center, self.config.image_plane_width) {
            Ok(plane) => {
                let node = scene.add_node(Renderable::Image(Arc::new(plane)));
                self.image_planes.push(node);
            }
            Err(err) => log::warn!("[session] image plane not created: {err}"),
        }
    }

    fn refuse(&self, refusal: Refusal) -> SessionTransition {
        SessionTransition {
            state: self.state,
            ui: self.ui.clone(),
            stroke: None,
            refused: Some(refusal),
        }
    }

    fn transition(&self, stroke: Option<StrokeHandle>) -> SessionTransition {
        SessionTransition {
            state: self.state,
            ui: self.ui.clone(),
            stroke,
            refused: None,
        }
    }
}

impl Default for DrawingSession {
    fn default() -> Self {
        Self::new(SketchConfig::default())
    }
}
