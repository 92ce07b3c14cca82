//! A single rendering adapter
//!
//! Devices are created once at startup and live for the whole process. The main loop only
//! compares them by identity and reads their description for instrumentation labels.

use crate::types::{
    AdapterInfo, CoreConfiguration, DetailLevel, DeviceCapabilities, DeviceConfiguration, DeviceId,
    DriverLevel,
};
use parking_lot::RwLock;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("adapter {id} failed to initialize: {reason}")]
    InitializationFailed { id: DeviceId, reason: String },

    #[error("no adapter with id {0}")]
    UnknownDevice(DeviceId),

    #[error("no adapters were reported by the platform")]
    NoAdapters,
}

pub struct EngineDevice {
    id: DeviceId,
    adapter: AdapterInfo,
    is_software: bool,
    debug_enabled: bool,

    /// Mutable at runtime (settings dialogs, quality presets)
    configuration: RwLock<DeviceConfiguration>,
    forced_detail_level: RwLock<Option<DetailLevel>>,
}

impl EngineDevice {
    pub fn new(id: DeviceId, adapter: AdapterInfo, core_config: &CoreConfiguration) -> Self {
        let is_software = core_config.is_software_adapter(&adapter.description);
        let configuration = DeviceConfiguration::for_hardware(is_software, adapter.driver_level);

        if let Some(reason) = &adapter.init_error {
            log::warn!("{} ({}) failed to initialize: {}", id, adapter.description, reason);
        }

        Self {
            id,
            adapter,
            is_software,
            debug_enabled: core_config.debug_enabled,
            configuration: RwLock::new(configuration),
            forced_detail_level: RwLock::new(core_config.forced_detail_level),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Adapter description with embedded NUL padding removed
    pub fn adapter_description(&self) -> String {
        self.adapter.description.replace('\0', "")
    }

    pub fn is_software(&self) -> bool {
        self.is_software
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.adapter.capabilities
    }

    pub fn dedicated_memory(&self) -> u64 {
        self.adapter.dedicated_memory
    }

    pub fn driver_level(&self) -> DriverLevel {
        self.adapter.driver_level
    }

    pub fn is_loaded_successfully(&self) -> bool {
        self.adapter.init_error.is_none()
    }

    /// Returns the initialization failure of this adapter, if there was one
    pub fn initialization_error(&self) -> Option<DeviceError> {
        self.adapter
            .init_error
            .as_ref()
            .map(|reason| DeviceError::InitializationFailed {
                id: self.id,
                reason: reason.clone(),
            })
    }

    /// Multisampling needs both the format support and a driver above level 9.1
    pub fn is_standard_antialiasing_possible(&self) -> bool {
        self.is_loaded_successfully()
            && self.adapter.capabilities.supports_antialiasing()
            && self.adapter.driver_level != DriverLevel::Level9_1
    }

    pub fn force_detail_level(&self, level: DetailLevel) {
        *self.forced_detail_level.write() = Some(level);
    }

    pub fn supported_detail_level(&self) -> DetailLevel {
        if let Some(forced) = *self.forced_detail_level.read() {
            return forced;
        }

        if self.is_software {
            DetailLevel::Low
        } else {
            DetailLevel::High
        }
    }

    pub fn is_high_detail_supported(&self) -> bool {
        self.supported_detail_level() == DetailLevel::High
    }

    pub fn default_pixel_shader_model(&self) -> &'static str {
        self.adapter.driver_level.default_pixel_shader_model()
    }

    pub fn supports_only_16bit_index_buffer(&self) -> bool {
        self.adapter.driver_level.supports_only_16bit_index_buffer()
    }

    pub fn configuration(&self) -> DeviceConfiguration {
        *self.configuration.read()
    }

    pub fn update_configuration<F>(&self, update_fn: F)
    where
        F: FnOnce(&mut DeviceConfiguration),
    {
        let mut configuration = self.configuration.write();
        update_fn(&mut configuration);
    }
}

impl PartialEq for EngineDevice {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EngineDevice {}

impl fmt::Debug for EngineDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineDevice")
            .field("id", &self.id)
            .field("description", &self.adapter.description)
            .field("is_software", &self.is_software)
            .field("driver_level", &self.adapter.driver_level)
            .finish()
    }
}

impl fmt::Display for EngineDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.adapter_description())
    }
}
