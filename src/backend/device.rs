// Physical device enumeration and selection
//
// Responsibilities:
// - Snapshot every enumerated GPU into an owned descriptor
// - Log properties, queue families, device extensions and feature flags
// - Pick a device through a pluggable suitability policy

use ash::vk;
use std::ffi::CStr;

use super::features;
use super::instance::ApiVersion;
use super::BootstrapError;

/// One queue family exposed by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamily {
    pub index: u32,
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
}

/// Owned copy of one physical device's identity and capabilities.
///
/// `handle` stays valid only while the instance that enumerated it is alive.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceDescriptor {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub api_version: ApiVersion,
    pub driver_version: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub device_type: vk::PhysicalDeviceType,
    pub pipeline_cache_uuid: [u8; vk::UUID_SIZE],
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: Vec<QueueFamily>,
    pub device_extensions: Vec<String>,
}

impl PhysicalDeviceDescriptor {
    pub fn has_graphics_queue(&self) -> bool {
        self.queue_families
            .iter()
            .any(|family| family.queue_count > 0 && family.flags.contains(vk::QueueFlags::GRAPHICS))
    }

    pub fn supports_extension(&self, name: &str) -> bool {
        self.device_extensions.iter().any(|ext| ext == name)
    }

    /// Ranking used by `SelectionStrategy::HighestScore` (prefer discrete GPU)
    pub fn score(&self) -> u32 {
        match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
            vk::PhysicalDeviceType::VIRTUAL_GPU => 10,
            _ => 1,
        }
    }

    pub fn pipeline_cache_uuid_hex(&self) -> String {
        self.pipeline_cache_uuid.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn log(&self, index: usize) {
        log::info!("Physical device {}: {}", index, self.name);
        log::debug!("   type: {:?}", self.device_type);
        log::debug!("   api version: {}", self.api_version);
        log::debug!("   driver version: 0x{:08X}", self.driver_version);
        log::debug!("   vendor id: 0x{:04X}, device id: 0x{:04X}", self.vendor_id, self.device_id);
        log::debug!("   pipeline cache uuid: {}", self.pipeline_cache_uuid_hex());

        log::debug!("   queue families: {}", self.queue_families.len());
        for family in &self.queue_families {
            log::debug!(
                "      family {}: {:?} x{}",
                family.index,
                family.flags,
                family.queue_count
            );
        }

        log::debug!("   device extensions: {}", self.device_extensions.len());
        for name in &self.device_extensions {
            log::trace!("      {}", name);
        }

        for (name, supported) in features::feature_flags(&self.features) {
            log::trace!("   feature {:<45} {}", name, supported);
        }
    }
}

/// Read every physical device exposed by the instance into owned descriptors
pub fn enumerate_physical_devices(
    instance: &ash::Instance,
) -> Result<Vec<PhysicalDeviceDescriptor>, BootstrapError> {
    let devices = unsafe { instance.enumerate_physical_devices() }.map_err(|result| {
        BootstrapError::Enumeration {
            what: "physical devices",
            result,
        }
    })?;

    let descriptors = devices
        .into_iter()
        .map(|device| {
            let props = unsafe { instance.get_physical_device_properties(device) };
            let features = unsafe { instance.get_physical_device_features(device) };
            let queue_families =
                unsafe { instance.get_physical_device_queue_family_properties(device) }
                    .iter()
                    .enumerate()
                    .map(|(index, family)| QueueFamily {
                        index: index as u32,
                        flags: family.queue_flags,
                        queue_count: family.queue_count,
                    })
                    .collect();
            let device_extensions =
                match unsafe { instance.enumerate_device_extension_properties(device) } {
                    Ok(extensions) => extensions
                        .iter()
                        .map(|ext| {
                            unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                                .to_string_lossy()
                                .into_owned()
                        })
                        .collect(),
                    Err(e) => {
                        log::error!("Failed to enumerate device extension properties: {}", e);
                        Vec::new()
                    }
                };

            PhysicalDeviceDescriptor {
                handle: device,
                name: unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
                    .to_string_lossy()
                    .into_owned(),
                api_version: ApiVersion::from_vk(props.api_version),
                driver_version: props.driver_version,
                vendor_id: props.vendor_id,
                device_id: props.device_id,
                device_type: props.device_type,
                pipeline_cache_uuid: props.pipeline_cache_uuid,
                features,
                queue_families,
                device_extensions,
            }
        })
        .collect();

    Ok(descriptors)
}

/// Decides whether a device can be used at all
pub trait SuitabilityPolicy {
    fn is_suitable(&self, device: &PhysicalDeviceDescriptor) -> bool;
}

impl<F> SuitabilityPolicy for F
where
    F: Fn(&PhysicalDeviceDescriptor) -> bool,
{
    fn is_suitable(&self, device: &PhysicalDeviceDescriptor) -> bool {
        self(device)
    }
}

/// Accepts every enumerable device. Placeholder until real requirements exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAny;

impl SuitabilityPolicy for AcceptAny {
    fn is_suitable(&self, _device: &PhysicalDeviceDescriptor) -> bool {
        true
    }
}

/// Threshold policy: every named feature must be supported
#[derive(Debug, Clone, Default)]
pub struct RequiredFeatures {
    names: Vec<String>,
}

impl RequiredFeatures {
    /// Unknown feature names are dropped with a warning
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| {
                let known = features::is_known_feature(name);
                if !known {
                    log::warn!("Unknown device feature '{}', ignoring", name);
                }
                known
            })
            .collect();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl SuitabilityPolicy for RequiredFeatures {
    fn is_suitable(&self, device: &PhysicalDeviceDescriptor) -> bool {
        self.names.iter().all(|name| {
            let supported = features::feature_enabled(&device.features, name).unwrap_or(false);
            if !supported {
                log::debug!("{} lacks required feature {}", device.name, name);
            }
            supported
        })
    }
}

/// Rejects devices without a queue family that supports graphics
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireGraphicsQueue;

impl SuitabilityPolicy for RequireGraphicsQueue {
    fn is_suitable(&self, device: &PhysicalDeviceDescriptor) -> bool {
        let supported = device.has_graphics_queue();
        if !supported {
            log::debug!("{} has no graphics queue family", device.name);
        }
        supported
    }
}

/// Every named device extension (e.g. `VK_KHR_swapchain`) must be exposed
#[derive(Debug, Clone, Default)]
pub struct RequiredDeviceExtensions {
    names: Vec<String>,
}

impl RequiredDeviceExtensions {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl SuitabilityPolicy for RequiredDeviceExtensions {
    fn is_suitable(&self, device: &PhysicalDeviceDescriptor) -> bool {
        self.names.iter().all(|name| {
            let supported = device.supports_extension(name);
            if !supported {
                log::debug!("{} lacks required device extension {}", device.name, name);
            }
            supported
        })
    }
}

/// Suitable only when every inner policy agrees
#[derive(Default)]
pub struct AllOf {
    policies: Vec<Box<dyn SuitabilityPolicy>>,
}

impl AllOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, policy: impl SuitabilityPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl SuitabilityPolicy for AllOf {
    fn is_suitable(&self, device: &PhysicalDeviceDescriptor) -> bool {
        self.policies.iter().all(|policy| policy.is_suitable(device))
    }
}

/// How to choose among suitable devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// First suitable device in enumeration order (not stable across drivers)
    #[default]
    FirstSuitable,
    /// Highest `score()`, ties resolved by enumeration order
    HighestScore,
}

pub struct DeviceSelector {
    policy: Box<dyn SuitabilityPolicy>,
    strategy: SelectionStrategy,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::new(AcceptAny, SelectionStrategy::FirstSuitable)
    }
}

impl DeviceSelector {
    pub fn new(policy: impl SuitabilityPolicy + 'static, strategy: SelectionStrategy) -> Self {
        Self {
            policy: Box::new(policy),
            strategy,
        }
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    pub fn select(
        &self,
        devices: Vec<PhysicalDeviceDescriptor>,
    ) -> Result<PhysicalDeviceDescriptor, BootstrapError> {
        if devices.is_empty() {
            log::error!("no physical device found");
            return Err(BootstrapError::NoPhysicalDevice);
        }

        let count = devices.len();
        log::info!("Physical devices: {}", count);
        if count > 1 && self.strategy == SelectionStrategy::FirstSuitable {
            log::warn!(
                "multiple ({}) physical devices located; taking the first suitable one",
                count
            );
        }

        let mut best: Option<PhysicalDeviceDescriptor> = None;

        for (index, device) in devices.into_iter().enumerate() {
            device.log(index);

            if !self.policy.is_suitable(&device) {
                log::info!("   {} is not suitable", device.name);
                continue;
            }

            match self.strategy {
                SelectionStrategy::FirstSuitable => {
                    best = Some(device);
                    break;
                }
                SelectionStrategy::HighestScore => {
                    if best.as_ref().map_or(true, |b| device.score() > b.score()) {
                        best = Some(device);
                    }
                }
            }
        }

        let selected = best.ok_or(BootstrapError::NoSuitableDevice(count))?;
        log::info!(
            "Selected GPU: {} (api {})",
            selected.name,
            selected.api_version
        );
        Ok(selected)
    }
}

#[cfg(test)]
pub(crate) fn test_device(name: &str, device_type: vk::PhysicalDeviceType) -> PhysicalDeviceDescriptor {
    PhysicalDeviceDescriptor {
        handle: vk::PhysicalDevice::null(),
        name: name.to_string(),
        api_version: ApiVersion::new(1, 3, 0),
        driver_version: 1,
        vendor_id: 0x10de,
        device_id: 0x2684,
        device_type,
        pipeline_cache_uuid: [0; vk::UUID_SIZE],
        features: vk::PhysicalDeviceFeatures::default(),
        queue_families: vec![QueueFamily {
            index: 0,
            flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
            queue_count: 1,
        }],
        device_extensions: vec!["VK_KHR_swapchain".to_string()],
    }
}
