use crate::capture::ImagePlane;
use crate::geometry::RibbonMesh;
use crate::stroke::StrokeColor;
use std::sync::Arc;
use thiserror::Error;

/// Handle referencing a renderable node attached to a scene.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Content the external renderer draws every frame.
///
/// Payloads are reference counted so a frame snapshot can hold them while the
/// scene keeps mutating its own copy.
#[derive(Debug, Clone)]
pub enum Renderable {
    Stroke {
        mesh: Arc<RibbonMesh>,
        color: StrokeColor,
    },
    Image(Arc<ImagePlane>),
}

impl Renderable {
    pub fn stroke(color: StrokeColor) -> Self {
        Renderable::Stroke {
            mesh: Arc::new(RibbonMesh::new()),
            color,
        }
    }

    pub fn is_stroke(&self) -> bool {
        matches!(self, Renderable::Stroke { .. })
    }

    pub fn triangle_count(&self) -> usize {
        match self {
            Renderable::Stroke { mesh, .. } => mesh.triangle_count(),
            Renderable::Image(_) => 2,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} is not attached to the scene")]
    NoSuchNode(NodeId),
    #[error("node {0:?} does not hold stroke geometry")]
    NotAStroke(NodeId),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Insertion/removal contract between the drawing core and the renderer.
pub trait SceneSink {
    fn add_node(&mut self, node: Renderable) -> NodeId;

    /// Mutable access to a stroke node's mesh. Edits made through the returned
    /// reference become visible to the renderer only once the call that made
    /// them returns.
    fn stroke_mesh_mut(&mut self, id: NodeId) -> SceneResult<&mut RibbonMesh>;

    fn remove_node(&mut self, id: NodeId) -> SceneResult<Renderable>;

    fn contains(&self, id: NodeId) -> bool;
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Renderable>,
}

/// In-process scene graph: generational slots with a free list.
#[derive(Debug, Default)]
pub struct Scene {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    len: usize,
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Incremented on every insertion, geometry edit, and removal.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: NodeId) -> Option<&Renderable> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Renderable)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::new(index as u32, slot.generation), node))
        })
    }

    pub fn stroke_count(&self) -> usize {
        self.nodes().filter(|(_, node)| node.is_stroke()).count()
    }

    fn slot_mut(&mut self, id: NodeId) -> SceneResult<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.node.is_some())
            .ok_or(SceneError::NoSuchNode(id))
    }
}

impl SceneSink for Scene {
    fn add_node(&mut self, node: Renderable) -> NodeId {
        self.revision += 1;
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    fn stroke_mesh_mut(&mut self, id: NodeId) -> SceneResult<&mut RibbonMesh> {
        let is_stroke = self
            .get(id)
            .map(Renderable::is_stroke)
            .ok_or(SceneError::NoSuchNode(id))?;
        if !is_stroke {
            return Err(SceneError::NotAStroke(id));
        }
        self.revision += 1;
        match self.slot_mut(id)?.node.as_mut() {
            // Copies only while a published snapshot still holds the previous mesh.
            Some(Renderable::Stroke { mesh, .. }) => Ok(Arc::make_mut(mesh)),
            _ => Err(SceneError::NotAStroke(id)),
        }
    }

    fn remove_node(&mut self, id: NodeId) -> SceneResult<Renderable> {
        let slot = self.slot_mut(id)?;
        let node = slot.node.take().ok_or(SceneError::NoSuchNode(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.len -= 1;
        self.revision += 1;
        Ok(node)
    }

    fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn add_and_get_node() {
        let mut scene = Scene::new();
        let id = scene.add_node(Renderable::stroke(StrokeColor::RED));

        assert!(scene.contains(id));
        assert_eq!(scene.len(), 1);
        assert!(scene.get(id).map(Renderable::is_stroke).unwrap_or(false));
    }

    #[test]
    fn remove_detaches_node() {
        let mut scene = Scene::new();
        let id = scene.add_node(Renderable::stroke(StrokeColor::RED));

        let removed = scene.remove_node(id).expect("node attached");

        assert!(removed.is_stroke());
        assert!(!scene.contains(id));
        assert!(scene.is_empty());
    }

    #[test]
    fn generations_increment_after_remove() {
        let mut scene = Scene::new();
        let a = scene.add_node(Renderable::stroke(StrokeColor::RED));
        scene.remove_node(a).unwrap();

        let b = scene.add_node(Renderable::stroke(StrokeColor::RED));
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(!scene.contains(a));
    }

    #[test]
    fn removing_stale_node_fails() {
        let mut scene = Scene::new();
        let stale = NodeId::new(999, 1);

        let err = scene.remove_node(stale).expect_err("stale node should error");
        assert_eq!(err, SceneError::NoSuchNode(stale));
    }

    #[test]
    fn mesh_edits_do_not_leak_into_held_snapshots() {
        let mut scene = Scene::new();
        let id = scene.add_node(Renderable::stroke(StrokeColor::RED));
        let held = scene.get(id).cloned().expect("node attached");

        let mesh = scene.stroke_mesh_mut(id).expect("stroke node");
        let mut builder = crate::geometry::RibbonBuilder::new(
            0.01,
            crate::geometry::RibbonOrientation::default(),
            1e-6,
        );
        builder.push(mesh, Vec3::ZERO);
        builder.push(mesh, Vec3::X);

        match held {
            Renderable::Stroke { mesh, .. } => assert!(mesh.is_empty()),
            Renderable::Image(_) => panic!("expected stroke"),
        }
        match scene.get(id) {
            Some(Renderable::Stroke { mesh, .. }) => assert_eq!(mesh.segment_count(), 1),
            _ => panic!("expected stroke"),
        }
    }

    #[test]
    fn revision_tracks_mutations() {
        let mut scene = Scene::new();
        let before = scene.revision();
        let id = scene.add_node(Renderable::stroke(StrokeColor::WHITE));
        scene.stroke_mesh_mut(id).unwrap();
        scene.remove_node(id).unwrap();

        assert_eq!(scene.revision(), before + 3);
    }
}
