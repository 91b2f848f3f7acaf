use glam::{Quat, Vec3};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedReason {
    Initializing,
    ExcessiveMotion,
    InsufficientFeatures,
    Relocalizing,
}

impl fmt::Display for LimitedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LimitedReason::Initializing => "initializing",
            LimitedReason::ExcessiveMotion => "excessive motion",
            LimitedReason::InsufficientFeatures => "insufficient features",
            LimitedReason::Relocalizing => "relocalizing",
        };
        f.write_str(label)
    }
}

/// Raw tracking state reported by the device's positional tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Normal,
    Limited(LimitedReason),
    NotAvailable,
}

impl TrackingState {
    /// Only `Normal` tracking is good enough to place strokes.
    pub fn quality(self) -> TrackingQuality {
        match self {
            TrackingState::Normal => TrackingQuality::Ready,
            other => TrackingQuality::NotReady {
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingState::Normal => f.write_str("Normal"),
            TrackingState::Limited(reason) => write!(f, "Limited ({reason})"),
            TrackingState::NotAvailable => f.write_str("Not available"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingQuality {
    Ready,
    NotReady { reason: String },
}

impl TrackingQuality {
    pub fn is_ready(&self) -> bool {
        matches!(self, TrackingQuality::Ready)
    }
}

/// Camera pose in world space. The camera looks down its local `-Z` axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl CameraPose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// World point `distance` meters in front of the camera, on the optical axis.
    pub fn point_ahead(&self, distance: f32) -> Vec3 {
        self.position + self.forward() * distance
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

#[derive(Debug)]
pub struct TrackingError {
    reason: String,
}

impl TrackingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for TrackingError {}

pub type TrackingResult<T> = Result<T, TrackingError>;

/// Positional tracking collaborator, sampled on demand.
pub trait TrackingSource: Send {
    fn label(&self) -> &'static str;
    fn tracking_state(&self) -> TrackingState;
    fn camera_pose(&self) -> CameraPose;

    /// Called once per rendered frame before any sampling. An error reports a
    /// session failure; the source is expected to keep reporting a state.
    fn advance(&mut self, _delta_seconds: f32) -> TrackingResult<()> {
        Ok(())
    }

    fn quality(&self) -> TrackingQuality {
        self.tracking_state().quality()
    }

    /// World point under the center of the viewport, `depth` meters in front of
    /// the camera.
    fn viewport_center(&self, depth: f32) -> Vec3 {
        self.camera_pose().point_ahead(depth)
    }
}

/// Tracker that warms up for a few frames and then orbits a fixed point.
pub struct SimulatedTracking {
    warmup_frames: u32,
    frames: u32,
    elapsed: f32,
    radius: f32,
    height: f32,
    angular_speed: f32,
    forced: Option<TrackingState>,
    pending_failure: Option<String>,
}

impl SimulatedTracking {
    pub fn new(warmup_frames: u32) -> Self {
        Self {
            warmup_frames,
            frames: 0,
            elapsed: 0.0,
            radius: 0.3,
            height: 1.4,
            angular_speed: 0.8,
            forced: None,
            pending_failure: None,
        }
    }

    /// Overrides the scripted state until cleared with `None`.
    pub fn force_state(&mut self, state: Option<TrackingState>) {
        self.forced = state;
    }

    /// Makes the next `advance` report a session failure.
    pub fn fail_next(&mut self, reason: impl Into<String>) {
        self.pending_failure = Some(reason.into());
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }
}

impl Default for SimulatedTracking {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TrackingSource for SimulatedTracking {
    fn label(&self) -> &'static str {
        "Simulated Tracking"
    }

    fn tracking_state(&self) -> TrackingState {
        if let Some(state) = self.forced {
            return state;
        }
        if self.frames < self.warmup_frames {
            TrackingState::Limited(LimitedReason::Initializing)
        } else {
            TrackingState::Normal
        }
    }

    fn camera_pose(&self) -> CameraPose {
        let angle = self.elapsed * self.angular_speed;
        let position = Vec3::new(
            self.radius * angle.cos(),
            self.height,
            self.radius * angle.sin(),
        );
        CameraPose::new(position, Quat::from_rotation_y(-angle))
    }

    fn advance(&mut self, delta_seconds: f32) -> TrackingResult<()> {
        self.frames = self.frames.saturating_add(1);
        self.elapsed += delta_seconds.max(0.0);
        match self.pending_failure.take() {
            Some(reason) => Err(TrackingError::new(reason)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_normal_tracking_is_ready() {
        assert!(TrackingState::Normal.quality().is_ready());
        assert_eq!(
            TrackingState::Limited(LimitedReason::ExcessiveMotion).quality(),
            TrackingQuality::NotReady {
                reason: "Limited (excessive motion)".into()
            }
        );
        assert!(!TrackingState::NotAvailable.quality().is_ready());
    }

    #[test]
    fn identity_pose_looks_down_negative_z() {
        let pose = CameraPose::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY);
        let point = pose.point_ahead(0.5);
        assert!((point - Vec3::new(1.0, 2.0, 2.5)).length() < 1e-6);
    }

    #[test]
    fn simulated_tracking_warms_up() {
        let mut tracking = SimulatedTracking::new(2);
        assert!(!tracking.quality().is_ready());

        tracking.advance(0.016).unwrap();
        assert!(!tracking.quality().is_ready());
        tracking.advance(0.016).unwrap();
        assert!(tracking.quality().is_ready());
    }

    #[test]
    fn simulated_camera_moves_between_frames() {
        let mut tracking = SimulatedTracking::new(0);
        let before = tracking.viewport_center(0.1);
        tracking.advance(0.1).unwrap();
        let after = tracking.viewport_center(0.1);

        assert!(before.distance(after) > 1e-4);
    }

    #[test]
    fn forced_state_and_failures() {
        let mut tracking = SimulatedTracking::new(0);
        tracking.force_state(Some(TrackingState::NotAvailable));
        assert_eq!(tracking.tracking_state(), TrackingState::NotAvailable);
        tracking.force_state(None);
        assert_eq!(tracking.tracking_state(), TrackingState::Normal);

        tracking.fail_next("camera access revoked");
        let err = tracking.advance(0.016).unwrap_err();
        assert_eq!(err.to_string(), "camera access revoked");
        assert!(tracking.advance(0.016).is_ok());
    }
}
