use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Interleaved vertex layout uploaded by the renderer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Triangle-strip ribbon expressed as an indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RibbonMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    segments: usize,
}

impl RibbonMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of point-to-point segments emitted so far.
    pub fn segment_count(&self) -> usize {
        self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments == 0
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Axis-aligned bounds of all emitted vertices.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(Vertex::position);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

/// Axis the ribbon's flat side is kept perpendicular to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RibbonOrientation {
    /// Side vector is `direction x up`; the ribbon lies flat against `up`.
    FixedUp { up: Vec3 },
    /// Side vector is perpendicular to the line of sight of the last known viewer.
    FaceViewer,
}

impl Default for RibbonOrientation {
    fn default() -> Self {
        RibbonOrientation::FixedUp { up: Vec3::Y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentResult {
    /// First point of the ribbon; nothing to connect yet.
    First,
    Emitted,
    /// Distance to the previous point was below the minimum segment length.
    Degenerate,
}

/// Incrementally extends a [`RibbonMesh`] one point at a time.
///
/// Consecutive segments share their boundary vertex pair, so the strip has no
/// gaps regardless of how irregularly the points are spaced. Each call pushes
/// at most four vertices and six indices.
#[derive(Debug, Clone)]
pub struct RibbonBuilder {
    half_width: f32,
    orientation: RibbonOrientation,
    min_segment_length: f32,
    viewer: Vec3,
    last_point: Option<Vec3>,
}

impl RibbonBuilder {
    pub fn new(width: f32, orientation: RibbonOrientation, min_segment_length: f32) -> Self {
        Self {
            half_width: width.abs() * 0.5,
            orientation,
            min_segment_length: min_segment_length.max(0.0),
            viewer: Vec3::ZERO,
            last_point: None,
        }
    }

    pub fn width(&self) -> f32 {
        self.half_width * 2.0
    }

    pub fn orientation(&self) -> RibbonOrientation {
        self.orientation
    }

    pub fn set_viewer(&mut self, position: Vec3) {
        self.viewer = position;
    }

    pub fn last_point(&self) -> Option<Vec3> {
        self.last_point
    }

    /// What `push` would do with `point`, without touching any mesh. Only
    /// `Emitted` writes geometry.
    pub fn classify(&self, point: Vec3) -> SegmentResult {
        let Some(previous) = self.last_point else {
            return SegmentResult::First;
        };
        // Also rejects NaN lengths.
        if !(previous.distance(point) > self.min_segment_length) {
            return SegmentResult::Degenerate;
        }
        SegmentResult::Emitted
    }

    pub fn push(&mut self, mesh: &mut RibbonMesh, point: Vec3) -> SegmentResult {
        let Some(previous) = self.last_point else {
            self.last_point = Some(point);
            return SegmentResult::First;
        };
        if self.classify(point) == SegmentResult::Degenerate {
            return SegmentResult::Degenerate;
        }

        let direction = point - previous;
        let tangent = direction / direction.length();
        let axis = self.reference_axis(previous, point);
        let mut side = tangent.cross(axis).normalize_or_zero();
        if side == Vec3::ZERO {
            side = tangent.any_orthonormal_vector();
        }
        let normal = side.cross(tangent).normalize_or_zero();
        let offset = side * self.half_width;

        if mesh.vertices.is_empty() {
            mesh.vertices.push(Vertex::new(previous - offset, normal));
            mesh.vertices.push(Vertex::new(previous + offset, normal));
        }

        let base = (mesh.vertices.len() - 2) as u32;
        mesh.vertices.push(Vertex::new(point - offset, normal));
        mesh.vertices.push(Vertex::new(point + offset, normal));
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
        mesh.segments += 1;

        self.last_point = Some(point);
        SegmentResult::Emitted
    }

    fn reference_axis(&self, from: Vec3, to: Vec3) -> Vec3 {
        match self.orientation {
            RibbonOrientation::FixedUp { up } => up,
            RibbonOrientation::FaceViewer => {
                let midpoint = (from + to) * 0.5;
                let to_viewer = (self.viewer - midpoint).normalize_or_zero();
                if to_viewer == Vec3::ZERO {
                    Vec3::Y
                } else {
                    to_viewer
                }
            }
        }
    }
}

/// Builds a complete ribbon for an already known point sequence.
pub fn build_ribbon(
    points: &[Vec3],
    width: f32,
    orientation: RibbonOrientation,
    min_segment_length: f32,
) -> RibbonMesh {
    let mut builder = RibbonBuilder::new(width, orientation, min_segment_length);
    let mut mesh = RibbonMesh::new();
    for &point in points {
        builder.push(&mut mesh, point);
    }
    mesh
}
