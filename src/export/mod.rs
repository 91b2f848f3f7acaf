use crate::geometry::{RibbonMesh, build_ribbon};
use crate::scene::SceneSink;
use crate::stroke::{StrokeAccumulator, StrokeColor, StrokeHandle};
use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("drawing file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("drawing json is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported drawing version {0} (expected {})", EXPORT_VERSION)]
    UnsupportedVersion(u32),
    #[error("stroke {0} has a non-positive width or a non-finite point")]
    InvalidStroke(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    pub color: StrokeColor,
    pub width: f32,
    pub points: Vec<Vec3>,
}

impl StrokeRecord {
    fn is_valid(&self) -> bool {
        self.width.is_finite()
            && self.width > 0.0
            && self.points.iter().all(|point| point.is_finite())
    }
}

/// Finished strokes in a form that survives the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingExport {
    pub version: u32,
    pub strokes: Vec<StrokeRecord>,
}

impl DrawingExport {
    /// Captures the finalized strokes; an in-progress stroke is not exported.
    pub fn from_accumulator(strokes: &StrokeAccumulator) -> Self {
        Self {
            version: EXPORT_VERSION,
            strokes: strokes
                .finalized()
                .iter()
                .map(|stroke| StrokeRecord {
                    color: stroke.color(),
                    width: stroke.width(),
                    points: stroke.points().to_vec(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let export: DrawingExport = serde_json::from_str(json)?;
        if export.version != EXPORT_VERSION {
            return Err(ExportError::UnsupportedVersion(export.version));
        }
        if let Some(index) = export.strokes.iter().position(|record| !record.is_valid()) {
            return Err(ExportError::InvalidStroke(index));
        }
        Ok(export)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, ExportError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn total_points(&self) -> usize {
        self.strokes.iter().map(|record| record.points.len()).sum()
    }
}

/// Attaches every exported stroke as a finalized stroke. Ribbons are rebuilt
/// in parallel, then inserted in export order.
pub fn restore_into(
    export: &DrawingExport,
    strokes: &mut StrokeAccumulator,
    scene: &mut dyn SceneSink,
) -> Vec<StrokeHandle> {
    let policy = *strokes.policy();
    let meshes: Vec<RibbonMesh> = export
        .strokes
        .par_iter()
        .map(|record| {
            build_ribbon(
                &record.points,
                record.width,
                policy.orientation,
                policy.min_segment_length,
            )
        })
        .collect();

    let handles: Vec<StrokeHandle> = export
        .strokes
        .iter()
        .zip(meshes)
        .map(|(record, mesh)| {
            strokes.insert_finalized(
                scene,
                record.color,
                record.width,
                record.points.clone(),
                mesh,
            )
        })
        .collect();
    log::info!(
        "[export] restored {} strokes ({} points)",
        handles.len(),
        export.total_points()
    );
    handles
}
