//! Adapter and capability types shared by every device

use std::fmt;

/// Index of an adapter in the enumeration order of the platform.
///
/// Stable for the lifetime of the process, which makes it the identity of an `EngineDevice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// Detail level a device is able to handle
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    #[default]
    Low = 1,
    High = 2,
}

/// Feature level reported by the graphics driver
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DriverLevel {
    Level9_1 = 1,
    Level9_2 = 2,
    Level9_3 = 3,
    Level10 = 4,
    Level11 = 5,
}

impl DriverLevel {
    /// Name of the default pixel shader model for this driver level
    pub fn default_pixel_shader_model(self) -> &'static str {
        match self {
            DriverLevel::Level9_1 | DriverLevel::Level9_2 => "ps_4_0_level_9_1",
            DriverLevel::Level9_3 => "ps_4_0_level_9_3",
            DriverLevel::Level11 => "ps_5_0",
            DriverLevel::Level10 => "ps_4_0",
        }
    }

    /// Level 9.1 hardware can only address 16-bit index buffers
    pub fn supports_only_16bit_index_buffer(self) -> bool {
        self == DriverLevel::Level9_1
    }

    /// Level 10 and above
    pub fn is_level10_or_upper(self) -> bool {
        self >= DriverLevel::Level10
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureQuality {
    #[default]
    Low = 0,
    High = 1,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryQuality {
    #[default]
    Low = 0,
    High = 1,
}

/// Capability flags (bitfield)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCapabilities(pub u32);

impl DeviceCapabilities {
    pub const NONE: u32 = 0;
    pub const MULTISAMPLE_RENDER_TARGET: u32 = 1 << 0;
    pub const MULTISAMPLE_RESOLVE: u32 = 1 << 1;
    pub const DRAWING_2D: u32 = 1 << 2;
    pub const VIDEO_CAPTURE: u32 = 1 << 3;

    pub fn new(flags: u32) -> Self {
        Self(flags)
    }

    pub fn contains(&self, flags: u32) -> bool {
        self.0 & flags == flags
    }

    /// Both multisample render targets and resolve are required for antialiasing
    pub fn supports_antialiasing(&self) -> bool {
        self.contains(Self::MULTISAMPLE_RENDER_TARGET | Self::MULTISAMPLE_RESOLVE)
    }

    pub fn supports_drawing_2d(&self) -> bool {
        self.contains(Self::DRAWING_2D)
    }
}

/// Raw adapter data as reported by the platform during enumeration
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub description: String,
    pub driver_level: DriverLevel,
    pub capabilities: DeviceCapabilities,
    /// Dedicated video memory in bytes
    pub dedicated_memory: u64,
    /// Error raised while the platform initialized this adapter, if any
    pub init_error: Option<String>,
}

impl AdapterInfo {
    pub fn new(description: impl Into<String>, driver_level: DriverLevel) -> Self {
        Self {
            description: description.into(),
            driver_level,
            capabilities: DeviceCapabilities::default(),
            dedicated_memory: 0,
            init_error: None,
        }
    }

    pub fn with_capabilities(mut self, flags: u32) -> Self {
        self.capabilities = DeviceCapabilities::new(flags);
        self
    }

    pub fn with_init_error(mut self, error: impl Into<String>) -> Self {
        self.init_error = Some(error.into());
        self
    }
}

/// Engine-wide settings applied to every enumerated device
#[derive(Debug, Clone)]
pub struct CoreConfiguration {
    pub debug_enabled: bool,
    /// Adapter descriptions starting with one of these are classified as software rasterizers
    pub software_adapter_prefixes: Vec<String>,
    /// Detail level forced onto every device, regardless of its hardware class
    pub forced_detail_level: Option<DetailLevel>,
}

impl Default for CoreConfiguration {
    fn default() -> Self {
        Self {
            debug_enabled: false,
            software_adapter_prefixes: vec![
                "Microsoft Basic Render Driver".to_string(),
                "llvmpipe".to_string(),
                "SwiftShader".to_string(),
            ],
            forced_detail_level: None,
        }
    }
}

impl CoreConfiguration {
    pub fn is_software_adapter(&self, description: &str) -> bool {
        self.software_adapter_prefixes
            .iter()
            .any(|prefix| description.starts_with(prefix.as_str()))
    }
}

/// Per-device quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceConfiguration {
    pub texture_quality: TextureQuality,
    pub geometry_quality: GeometryQuality,
}

impl DeviceConfiguration {
    /// Hardware adapters at level 10 or above get high quality defaults
    pub fn for_hardware(is_software: bool, driver_level: DriverLevel) -> Self {
        if !is_software && driver_level.is_level10_or_upper() {
            Self {
                texture_quality: TextureQuality::High,
                geometry_quality: GeometryQuality::High,
            }
        } else {
            Self::default()
        }
    }
}
