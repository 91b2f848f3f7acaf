use crate::scene::{NodeId, Renderable, Scene};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Everything the renderer needs to draw one frame. Payloads are shared with
/// the scene, so taking a snapshot never copies geometry.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub frame_index: u64,
    pub scene_revision: u64,
    pub nodes: Vec<(NodeId, Renderable)>,
}

impl FrameSnapshot {
    pub fn capture(frame_index: u64, scene: &Scene) -> Self {
        Self {
            frame_index,
            scene_revision: scene.revision(),
            nodes: scene
                .nodes()
                .map(|(id, node)| (id, node.clone()))
                .collect(),
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.nodes.iter().filter(|(_, node)| node.is_stroke()).count()
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|(_, node)| node.triangle_count())
            .sum()
    }
}

/// Single-slot publish-by-replace handoff between the frame thread and the
/// render thread. The writer only ever replaces whole snapshots, so the reader
/// sees either the previous complete frame or the next one.
#[derive(Debug, Clone, Default)]
pub struct FrameMailbox {
    slot: Arc<Mutex<Option<Arc<FrameSnapshot>>>>,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when an unconsumed frame was dropped in favor of this one.
    pub fn publish(&self, snapshot: FrameSnapshot) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.replace(Arc::new(snapshot)).is_some()
    }

    pub fn take_latest(&self) -> Option<Arc<FrameSnapshot>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn has_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RenderError {
    FrameOutOfOrder { expected: u64, got: u64 },
    Backend(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::FrameOutOfOrder { expected, got } => write!(
                f,
                "renderer expected frame {expected} or later but received {got}"
            ),
            RenderError::Backend(reason) => write!(f, "render backend failure: {reason}"),
        }
    }
}

impl std::error::Error for RenderError {}

pub type RenderResult<T> = Result<T, RenderError>;

pub trait RenderBackend: Send {
    fn label(&self) -> &'static str;

    /// Draws the frame and returns the index of the frame actually drawn.
    fn submit(&mut self, frame: &FrameSnapshot) -> RenderResult<u64>;
}

/// Backend that draws nothing and keeps counters.
#[derive(Debug, Default)]
pub struct NullRenderBackend {
    frames: u64,
    last_triangles: usize,
}

impl NullRenderBackend {
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_triangles(&self) -> usize {
        self.last_triangles
    }
}

impl RenderBackend for NullRenderBackend {
    fn label(&self) -> &'static str {
        "Null Render Backend"
    }

    fn submit(&mut self, frame: &FrameSnapshot) -> RenderResult<u64> {
        self.frames += 1;
        self.last_triangles = frame.triangle_count();
        log::trace!(
            "[render] frame {} - {} nodes, {} triangles",
            frame.frame_index,
            frame.nodes.len(),
            self.last_triangles
        );
        Ok(frame.frame_index)
    }
}

pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    mailbox: FrameMailbox,
    last_frame: Option<u64>,
    rendered: u64,
    last_triangles: usize,
}

impl Renderer {
    pub fn new(backend: Box<dyn RenderBackend>, mailbox: FrameMailbox) -> Self {
        Self {
            backend,
            mailbox,
            last_frame: None,
            rendered: 0,
            last_triangles: 0,
        }
    }

    /// Draws the newest published frame, if any. Frames skipped because a newer
    /// one replaced them are never drawn.
    pub fn render_latest(&mut self) -> RenderResult<Option<u64>> {
        let Some(frame) = self.mailbox.take_latest() else {
            return Ok(None);
        };

        let expected = self.last_frame.map_or(0, |last| last + 1);
        if frame.frame_index < expected {
            return Err(RenderError::FrameOutOfOrder {
                expected,
                got: frame.frame_index,
            });
        }

        let drawn = self.backend.submit(&frame)?;
        if drawn != frame.frame_index {
            return Err(RenderError::FrameOutOfOrder {
                expected: frame.frame_index,
                got: drawn,
            });
        }

        self.last_frame = Some(drawn);
        self.rendered += 1;
        self.last_triangles = frame.triangle_count();
        Ok(Some(drawn))
    }

    pub fn backend_label(&self) -> &'static str {
        self.backend.label()
    }

    pub fn mailbox(&self) -> &FrameMailbox {
        &self.mailbox
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    pub fn frames_rendered(&self) -> u64 {
        self.rendered
    }

    pub fn last_triangles(&self) -> usize {
        self.last_triangles
    }
}
