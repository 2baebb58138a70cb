//! Grid raycasting engine: DDA wall casting, perspective projection,
//! billboard sprites and circle-vs-grid collision for a 2.5D first-person
//! view of a tile map.
//!
//! The library is headless. Windowing, input polling and pixel output live in
//! the `gridcaster` binary.

pub mod camera;
pub mod collision;
pub mod config;
pub mod error;
pub mod frame;
pub mod projector;
pub mod raycaster;
pub mod sprites;
pub mod world;

pub use camera::PlayerPose;
pub use config::{DisplayMode, EngineConfig, Stages};
pub use error::{LoadError, MapError};
pub use frame::{Engine, Frame, FrameInput, Rotate};
pub use world::{MapDocument, TileMap};
