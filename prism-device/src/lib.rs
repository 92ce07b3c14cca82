//! Prism Devices
//!
//! Rendering adapters as seen by the engine: identity, capability queries and
//! per-device configuration.
//!
//! Devices are enumerated once at startup into a `DeviceRegistry` and shared as
//! `Arc<EngineDevice>` for the rest of the process.

pub mod device;
pub mod registry;
pub mod resource;
pub mod types;

pub use device::*;
pub use registry::*;
pub use resource::*;
pub use types::*;
