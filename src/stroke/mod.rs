use crate::geometry::{RibbonBuilder, RibbonMesh, RibbonOrientation, SegmentResult};
use crate::scene::{NodeId, Renderable, SceneSink};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Linear RGBA color applied to a whole stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl StrokeColor {
    pub const RED: StrokeColor = StrokeColor::rgb(1.0, 0.0, 0.0);
    pub const WHITE: StrokeColor = StrokeColor::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        let [r, g, b, a] = rgba.map(|channel| channel as f32 / 255.0);
        Self { r, g, b, a }
    }

    /// Color under a horizontal hue slider at `position` in `[0, 1]`.
    ///
    /// The slider's far left is white and the remainder sweeps the hue wheel at
    /// full saturation.
    pub fn from_slider(position: f32) -> Self {
        const WHITE_ZONE: f32 = 0.05;
        let position = if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if position < WHITE_ZONE {
            return StrokeColor::WHITE;
        }
        let hue = (position - WHITE_ZONE) / (1.0 - WHITE_ZONE) * 6.0;
        let x = 1.0 - ((hue % 2.0) - 1.0).abs();
        let (r, g, b) = match hue as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        StrokeColor::rgb(r, g, b)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for StrokeColor {
    fn default() -> Self {
        StrokeColor::WHITE
    }
}

/// Identifies a stroke for the lifetime of an accumulator. Handles are never
/// reused, including across resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrokeHandle(u64);

impl StrokeHandle {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StrokeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stroke#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeState {
    Active,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// First point of the stroke; no segment yet.
    Started,
    /// A segment to the previous point was added to the ribbon.
    Extended,
    /// The point was recorded but was too close to the previous one to emit geometry.
    Degenerate,
    /// The stroke reached its point cap; the point was dropped.
    Capped,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrokeError {
    #[error("{0} is finalized and no longer accepts points")]
    NotActive(StrokeHandle),
    #[error("{0} does not exist (never created or discarded by a reset)")]
    UnknownStroke(StrokeHandle),
}

/// Tunable geometry policy shared by every stroke of an accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokePolicy {
    pub orientation: RibbonOrientation,
    pub min_segment_length: f32,
    pub max_points_per_stroke: Option<usize>,
}

impl Default for StrokePolicy {
    fn default() -> Self {
        Self {
            orientation: RibbonOrientation::default(),
            min_segment_length: 1e-6,
            max_points_per_stroke: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stroke {
    handle: StrokeHandle,
    color: StrokeColor,
    width: f32,
    points: Vec<Vec3>,
    segments: usize,
    state: StrokeState,
    node: NodeId,
    builder: RibbonBuilder,
}

impl Stroke {
    pub fn handle(&self) -> StrokeHandle {
        self.handle
    }

    pub fn color(&self) -> StrokeColor {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    /// Scene node holding this stroke's ribbon.
    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// Turns a live point stream into ribbon strokes attached to a scene.
#[derive(Debug, Default)]
pub struct StrokeAccumulator {
    policy: StrokePolicy,
    next_handle: u64,
    viewer: Vec3,
    active: Option<Stroke>,
    finalized: Vec<Stroke>,
}

impl StrokeAccumulator {
    pub fn new(policy: StrokePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &StrokePolicy {
        &self.policy
    }

    /// Viewer position used by [`RibbonOrientation::FaceViewer`] ribbons.
    pub fn set_viewer(&mut self, position: Vec3) {
        self.viewer = position;
    }

    pub fn begin_stroke(
        &mut self,
        scene: &mut dyn SceneSink,
        color: StrokeColor,
        width: f32,
    ) -> StrokeHandle {
        if let Some(previous) = self.active.as_ref().map(Stroke::handle) {
            log::warn!("[stroke] {previous} still active when a new stroke began; finalizing it");
            if let Err(err) = self.end_stroke(previous) {
                log::warn!("[stroke] could not finalize {previous}: {err}");
            }
        }

        let handle = StrokeHandle(self.next_handle);
        self.next_handle += 1;
        let node = scene.add_node(Renderable::stroke(color));
        let mut builder = RibbonBuilder::new(
            width,
            self.policy.orientation,
            self.policy.min_segment_length,
        );
        builder.set_viewer(self.viewer);

        self.active = Some(Stroke {
            handle,
            color,
            width,
            points: Vec::new(),
            segments: 0,
            state: StrokeState::Active,
            node,
            builder,
        });
        log::debug!("[stroke] began {handle} (width {width})");
        handle
    }

    pub fn append_point(
        &mut self,
        scene: &mut dyn SceneSink,
        handle: StrokeHandle,
        point: Vec3,
    ) -> Result<AppendOutcome, StrokeError> {
        let Some(stroke) = self
            .active
            .as_mut()
            .filter(|stroke| stroke.handle == handle)
        else {
            let err = Self::rejection(&self.finalized, handle);
            log::warn!("[stroke] append rejected: {err}");
            return Err(err);
        };

        if let Some(max) = self.policy.max_points_per_stroke {
            if stroke.points.len() >= max {
                return Ok(AppendOutcome::Capped);
            }
        }

        stroke.points.push(point);
        stroke.builder.set_viewer(self.viewer);

        // First and degenerate points leave the published mesh untouched.
        let mut detached = RibbonMesh::new();
        let mesh = if stroke.builder.classify(point) == SegmentResult::Emitted {
            match scene.stroke_mesh_mut(stroke.node) {
                Ok(mesh) => mesh,
                Err(err) => {
                    log::warn!("[stroke] {handle} geometry not published: {err}");
                    &mut detached
                }
            }
        } else {
            &mut detached
        };

        let outcome = match stroke.builder.push(mesh, point) {
            SegmentResult::First => AppendOutcome::Started,
            SegmentResult::Emitted => {
                stroke.segments += 1;
                AppendOutcome::Extended
            }
            SegmentResult::Degenerate => AppendOutcome::Degenerate,
        };
        Ok(outcome)
    }

    pub fn end_stroke(&mut self, handle: StrokeHandle) -> Result<(), StrokeError> {
        match self.active.take() {
            Some(mut stroke) if stroke.handle == handle => {
                stroke.state = StrokeState::Finalized;
                log::debug!(
                    "[stroke] finalized {handle} with {} points, {} segments",
                    stroke.points.len(),
                    stroke.segments
                );
                self.finalized.push(stroke);
                Ok(())
            }
            other => {
                self.active = other;
                Err(Self::rejection(&self.finalized, handle))
            }
        }
    }

    /// Removes every stroke node from the scene and discards all stroke data.
    /// Returns the number of strokes discarded.
    pub fn reset_all(&mut self, scene: &mut dyn SceneSink) -> usize {
        let strokes: Vec<Stroke> = self
            .active
            .take()
            .into_iter()
            .chain(self.finalized.drain(..))
            .collect();
        for stroke in &strokes {
            if let Err(err) = scene.remove_node(stroke.node) {
                log::warn!("[stroke] {} node already detached: {err}", stroke.handle);
            }
        }
        if !strokes.is_empty() {
            log::debug!("[stroke] reset discarded {} strokes", strokes.len());
        }
        strokes.len()
    }

    /// Attaches an already complete stroke, e.g. one restored from an export.
    pub fn insert_finalized(
        &mut self,
        scene: &mut dyn SceneSink,
        color: StrokeColor,
        width: f32,
        points: Vec<Vec3>,
        mesh: RibbonMesh,
    ) -> StrokeHandle {
        let handle = StrokeHandle(self.next_handle);
        self.next_handle += 1;
        let segments = mesh.segment_count();
        let node = scene.add_node(Renderable::Stroke {
            mesh: Arc::new(mesh),
            color,
        });
        self.finalized.push(Stroke {
            handle,
            color,
            width,
            points,
            segments,
            state: StrokeState::Finalized,
            node,
            builder: RibbonBuilder::new(
                width,
                self.policy.orientation,
                self.policy.min_segment_length,
            ),
        });
        handle
    }

    pub fn active(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    pub fn finalized(&self) -> &[Stroke] {
        &self.finalized
    }

    pub fn stroke(&self, handle: StrokeHandle) -> Option<&Stroke> {
        self.active
            .iter()
            .chain(self.finalized.iter())
            .find(|stroke| stroke.handle == handle)
    }

    /// Active plus finalized strokes.
    pub fn len(&self) -> usize {
        self.finalized.len() + usize::from(self.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_points(&self) -> usize {
        self.strokes().map(Stroke::point_count).sum()
    }

    pub fn total_segments(&self) -> usize {
        self.strokes().map(Stroke::segment_count).sum()
    }

    fn strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.active.iter().chain(self.finalized.iter())
    }

    fn rejection(finalized: &[Stroke], handle: StrokeHandle) -> StrokeError {
        if finalized.iter().any(|stroke| stroke.handle == handle) {
            StrokeError::NotActive(handle)
        } else {
            StrokeError::UnknownStroke(handle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;

    #[test]
    fn begin_stroke_attaches_empty_node() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();

        let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);

        let stroke = strokes.active().expect("stroke active");
        assert_eq!(stroke.handle(), handle);
        assert_eq!(stroke.point_count(), 0);
        assert_eq!(stroke.state(), StrokeState::Active);
        assert!(scene.contains(stroke.node()));
    }

    #[test]
    fn append_reports_outcomes() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();
        let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);

        let first = strokes.append_point(&mut scene, handle, Vec3::ZERO);
        let second = strokes.append_point(&mut scene, handle, Vec3::Y);
        let repeat = strokes.append_point(&mut scene, handle, Vec3::Y);

        assert_eq!(first, Ok(AppendOutcome::Started));
        assert_eq!(second, Ok(AppendOutcome::Extended));
        assert_eq!(repeat, Ok(AppendOutcome::Degenerate));

        let stroke = strokes.active().unwrap();
        assert_eq!(stroke.point_count(), 3);
        assert_eq!(stroke.segment_count(), 1);
        match scene.get(stroke.node()) {
            Some(Renderable::Stroke { mesh, color }) => {
                assert_eq!(mesh.segment_count(), 1);
                assert_eq!(*color, StrokeColor::RED);
            }
            other => panic!("expected stroke node, got {other:?}"),
        }
    }

    #[test]
    fn append_after_end_is_rejected() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();
        let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
        strokes.append_point(&mut scene, handle, Vec3::ZERO).unwrap();
        strokes.end_stroke(handle).unwrap();

        let err = strokes
            .append_point(&mut scene, handle, Vec3::X)
            .expect_err("finalized stroke");

        assert_eq!(err, StrokeError::NotActive(handle));
        assert_eq!(strokes.finalized()[0].points(), &[Vec3::ZERO]);
    }

    #[test]
    fn ending_unknown_stroke_keeps_active_one() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();
        let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);

        let bogus = StrokeHandle(42);
        assert_eq!(
            strokes.end_stroke(bogus),
            Err(StrokeError::UnknownStroke(bogus))
        );
        assert_eq!(strokes.active().map(Stroke::handle), Some(handle));
    }

    #[test]
    fn beginning_twice_finalizes_previous() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();
        let first = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
        let second = strokes.begin_stroke(&mut scene, StrokeColor::WHITE, 0.004);

        assert_ne!(first, second);
        assert_eq!(strokes.finalized().len(), 1);
        assert_eq!(strokes.finalized()[0].handle(), first);
        assert_eq!(strokes.active().map(Stroke::handle), Some(second));
    }

    #[test]
    fn reset_removes_nodes_and_invalidates_handles() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();
        let done = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
        strokes.end_stroke(done).unwrap();
        let live = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
        strokes.append_point(&mut scene, live, Vec3::ZERO).unwrap();

        assert_eq!(strokes.reset_all(&mut scene), 2);

        assert!(strokes.is_empty());
        assert!(scene.is_empty());
        assert_eq!(
            strokes.append_point(&mut scene, live, Vec3::X),
            Err(StrokeError::UnknownStroke(live))
        );
        let fresh = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
        assert_eq!(strokes.stroke(fresh).map(Stroke::point_count), Some(0));
    }

    #[test]
    fn point_cap_drops_excess_points() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::new(StrokePolicy {
            max_points_per_stroke: Some(2),
            ..StrokePolicy::default()
        });
        let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
        strokes.append_point(&mut scene, handle, Vec3::ZERO).unwrap();
        strokes.append_point(&mut scene, handle, Vec3::X).unwrap();

        assert_eq!(
            strokes.append_point(&mut scene, handle, Vec3::Y),
            Ok(AppendOutcome::Capped)
        );
        assert_eq!(strokes.active().unwrap().point_count(), 2);
    }

    #[test]
    fn degenerate_append_leaves_published_mesh_shared() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();
        let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
        let last = Vec3::new(1.0, 1.0, 0.0);
        for point in [Vec3::ZERO, Vec3::X, last] {
            strokes.append_point(&mut scene, handle, point).unwrap();
        }
        let node = strokes.active().unwrap().node();
        let snapshot = crate::render::FrameSnapshot::capture(0, &scene);
        let revision = scene.revision();

        assert_eq!(
            strokes.append_point(&mut scene, handle, last),
            Ok(AppendOutcome::Degenerate)
        );

        assert_eq!(scene.revision(), revision);
        assert_eq!(strokes.active().unwrap().point_count(), 4);
        let held = snapshot
            .nodes
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, renderable)| renderable);
        match (held, scene.get(node)) {
            (
                Some(Renderable::Stroke { mesh: held, .. }),
                Some(Renderable::Stroke { mesh: live, .. }),
            ) => assert!(Arc::ptr_eq(held, live)),
            _ => panic!("expected stroke nodes"),
        }

        strokes.append_point(&mut scene, handle, Vec3::Y).unwrap();
        assert_eq!(scene.revision(), revision + 1);
    }

    #[test]
    fn first_point_does_not_touch_scene() {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();
        let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
        let revision = scene.revision();

        strokes.append_point(&mut scene, handle, Vec3::ZERO).unwrap();

        assert_eq!(scene.revision(), revision);
    }

    #[test]
    fn slider_endpoints_map_to_white_and_red() {
        assert_eq!(StrokeColor::from_slider(0.0), StrokeColor::WHITE);
        let start = StrokeColor::from_slider(0.05);
        assert_eq!((start.r, start.g, start.b), (1.0, 0.0, 0.0));
        assert_eq!(StrokeColor::from_slider(f32::NAN), StrokeColor::WHITE);
        assert_eq!(StrokeColor::from_rgba8([255, 0, 0, 255]), StrokeColor::RED);
    }
}
