//! Device enumeration at engine startup

use crate::device::{DeviceError, EngineDevice};
use crate::types::{AdapterInfo, CoreConfiguration, DeviceId};
use std::sync::Arc;

/// All adapters known to the engine, in platform enumeration order.
///
/// Built once; devices are never added or removed afterwards.
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: Vec<Arc<EngineDevice>>,
    config: CoreConfiguration,
}

impl DeviceRegistry {
    /// Create one device per reported adapter.
    ///
    /// Adapters that failed to initialize are kept so they can be inspected, but they are
    /// never picked as the default device.
    pub fn enumerate<I>(adapters: I, config: CoreConfiguration) -> Self
    where
        I: IntoIterator<Item = AdapterInfo>,
    {
        let devices: Vec<Arc<EngineDevice>> = adapters
            .into_iter()
            .enumerate()
            .map(|(index, adapter)| Arc::new(EngineDevice::new(DeviceId(index as u32), adapter, &config)))
            .collect();

        for device in &devices {
            log::info!(
                "Enumerated {}: {} (software: {}, driver: {:?})",
                device.id(),
                device.adapter_description(),
                device.is_software(),
                device.driver_level()
            );
        }

        Self { devices, config }
    }

    pub fn config(&self) -> &CoreConfiguration {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EngineDevice>> {
        self.devices.iter()
    }

    pub fn get(&self, id: DeviceId) -> Result<Arc<EngineDevice>, DeviceError> {
        self.devices
            .iter()
            .find(|device| device.id() == id)
            .cloned()
            .ok_or(DeviceError::UnknownDevice(id))
    }

    /// First successfully loaded hardware adapter, falling back to a software one
    pub fn default_device(&self) -> Result<Arc<EngineDevice>, DeviceError> {
        if self.devices.is_empty() {
            return Err(DeviceError::NoAdapters);
        }

        let loaded = || self.devices.iter().filter(|d| d.is_loaded_successfully());

        loaded()
            .find(|d| !d.is_software())
            .or_else(|| loaded().next())
            .cloned()
            .ok_or_else(|| match self.devices[0].initialization_error() {
                Some(err) => err,
                None => DeviceError::NoAdapters,
            })
    }

    pub fn hardware_devices(&self) -> impl Iterator<Item = &Arc<EngineDevice>> {
        self.devices.iter().filter(|d| !d.is_software())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DriverLevel;

    fn adapters() -> Vec<AdapterInfo> {
        vec![
            AdapterInfo::new("Microsoft Basic Render Driver", DriverLevel::Level11),
            AdapterInfo::new("AMD Radeon RX 6600", DriverLevel::Level11).with_init_error("lost"),
            AdapterInfo::new("NVIDIA GeForce RTX 3050", DriverLevel::Level11),
        ]
    }

    #[test]
    fn test_enumeration_order() {
        let registry = DeviceRegistry::enumerate(adapters(), CoreConfiguration::default());
        assert_eq!(registry.len(), 3);

        let ids: Vec<u32> = registry.iter().map(|d| d.id().0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(registry.hardware_devices().count(), 2);
    }

    #[test]
    fn test_default_device_prefers_loaded_hardware() {
        let registry = DeviceRegistry::enumerate(adapters(), CoreConfiguration::default());
        let device = registry.default_device().unwrap();
        assert_eq!(device.id(), DeviceId(2));
    }

    #[test]
    fn test_default_device_falls_back_to_software() {
        let registry = DeviceRegistry::enumerate(
            vec![AdapterInfo::new("llvmpipe", DriverLevel::Level10)],
            CoreConfiguration::default(),
        );
        assert!(registry.default_device().unwrap().is_software());
    }

    #[test]
    fn test_empty_registry() {
        let registry = DeviceRegistry::enumerate(Vec::new(), CoreConfiguration::default());
        assert!(registry.is_empty());
        assert!(matches!(registry.default_device(), Err(DeviceError::NoAdapters)));
        assert!(matches!(
            registry.get(DeviceId(0)),
            Err(DeviceError::UnknownDevice(DeviceId(0)))
        ));
    }
}
