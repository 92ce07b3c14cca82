//! Prism Scenes
//!
//! Everything the main loop needs to know about scenes: the `Scene` contract,
//! per-cycle `UpdateState`, shared `Camera` state and a default `StandardScene`.
//!
//! Key points:
//! - Scenes are owned by application code and shared as `Arc<dyn Scene>`
//! - Object storage is array-based behind an RwLock (concurrent readers while rendering)
//! - Cached world transforms with a dirty flag system

pub mod camera;
pub mod scene;
pub mod standard_scene;
pub mod types;
pub mod update_state;

pub use camera::*;
pub use scene::*;
pub use standard_scene::*;
pub use types::*;
pub use update_state::*;
