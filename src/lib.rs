pub mod app;
pub mod capture;
pub mod config;
pub mod export;
pub mod geometry;
pub mod render;
pub mod scene;
pub mod session;
pub mod stroke;
pub mod tracking;

pub use app::{InputEvent, SketchApp};
pub use config::SketchConfig;
