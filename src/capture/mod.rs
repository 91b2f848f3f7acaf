use glam::{Quat, Vec3};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("captured frame has zero size ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} bytes, expected {expected} for RGBA8")]
    BufferSize { expected: usize, actual: usize },
    #[error("image plane width must be positive and finite")]
    InvalidPlaneWidth,
}

/// Still RGBA8 frame grabbed from the camera feed.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl CapturedFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::EmptyFrame { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CaptureError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Height over width.
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

/// Source of still frames from the camera feed.
pub trait FrameCapture: Send {
    fn capture_still(&mut self) -> Option<CapturedFrame>;
}

/// Produces gradient frames of a fixed size; stands in for a camera.
pub struct SyntheticCapture {
    width: u32,
    height: u32,
    captured: u64,
}

impl SyntheticCapture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            captured: 0,
        }
    }

    pub fn captured(&self) -> u64 {
        self.captured
    }
}

impl Default for SyntheticCapture {
    fn default() -> Self {
        // landscape camera buffer
        Self::new(64, 48)
    }
}

impl FrameCapture for SyntheticCapture {
    fn capture_still(&mut self) -> Option<CapturedFrame> {
        let (width, height) = (self.width, self.height);
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let r = (x * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                let b = (self.captured % 256) as u8;
                pixels.extend_from_slice(&[r, g, b, 255]);
            }
        }
        match CapturedFrame::new(width, height, pixels) {
            Ok(frame) => {
                self.captured += 1;
                Some(frame)
            }
            Err(err) => {
                log::warn!("[capture] synthetic frame rejected: {err}");
                None
            }
        }
    }
}

/// Flat textured quad showing a captured frame, floating in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlane {
    pub frame: CapturedFrame,
    pub width: f32,
    pub height: f32,
    pub position: Vec3,
    pub rotation: Quat,
}

impl ImagePlane {
    /// Places `frame` at `position`, `width` meters wide, keeping the frame's
    /// aspect ratio. The camera buffer is landscape, so the plane is turned a
    /// quarter turn clockwise about Z to appear upright in portrait.
    pub fn from_frame(
        frame: CapturedFrame,
        position: Vec3,
        width: f32,
    ) -> Result<Self, CaptureError> {
        if !(width.is_finite() && width > 0.0) {
            return Err(CaptureError::InvalidPlaneWidth);
        }
        let height = width * frame.aspect();
        Ok(Self {
            frame,
            width,
            height,
            position,
            rotation: Quat::from_rotation_z(-std::f32::consts::FRAC_PI_2),
        })
    }
}
