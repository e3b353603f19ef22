// Vulkan loader - the ash-backed `Backend`

use ash::Entry;
use std::ffi::CStr;

use super::debug::{self, DebugMessenger};
use super::device;
use super::instance::{self, ApiVersion, InstanceConfig};
use super::requirements::ResolvedRequirements;
use super::{
    Backend, BootstrapError, ExtensionRecord, LayerRecord, MessengerError, PhysicalDeviceDescriptor,
};

/// Loaded Vulkan library
pub struct VulkanLoader {
    entry: Entry,
}

impl VulkanLoader {
    /// Load the Vulkan library. Failure here means no Vulkan at all.
    pub fn load() -> Result<Self, BootstrapError> {
        let entry = unsafe { Entry::load() }?;

        match entry.try_enumerate_instance_version() {
            Ok(Some(version)) => log::info!("Vulkan loader version: {}", ApiVersion::from_vk(version)),
            Ok(None) => log::info!("Vulkan loader version: 1.0"),
            Err(e) => log::warn!("Failed to query loader version: {}", e),
        }

        Ok(Self { entry })
    }
}

fn lossy(chars: &[std::ffi::c_char]) -> String {
    unsafe { CStr::from_ptr(chars.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

impl Backend for VulkanLoader {
    type Instance = ash::Instance;
    type Messenger = DebugMessenger;

    fn instance_extensions(&self) -> Result<Vec<ExtensionRecord>, BootstrapError> {
        let extensions = self
            .entry
            .enumerate_instance_extension_properties(None)
            .map_err(|result| BootstrapError::Enumeration {
                what: "instance extensions",
                result,
            })?;

        Ok(extensions
            .iter()
            .map(|ext| ExtensionRecord {
                name: lossy(&ext.extension_name),
                spec_version: ext.spec_version,
            })
            .collect())
    }

    fn instance_layers(&self) -> Result<Vec<LayerRecord>, BootstrapError> {
        let layers = self
            .entry
            .enumerate_instance_layer_properties()
            .map_err(|result| BootstrapError::Enumeration {
                what: "instance layers",
                result,
            })?;

        Ok(layers
            .iter()
            .map(|layer| LayerRecord {
                name: lossy(&layer.layer_name),
                spec_version: layer.spec_version,
                implementation_version: layer.implementation_version,
                description: lossy(&layer.description),
            })
            .collect())
    }

    fn create_instance(
        &self,
        config: &InstanceConfig,
        resolved: &ResolvedRequirements,
        chain_messenger: bool,
    ) -> Result<ash::Instance, BootstrapError> {
        instance::create_instance(&self.entry, config, resolved, chain_messenger)
    }

    fn create_messenger(&self, instance: &ash::Instance) -> Result<DebugMessenger, MessengerError> {
        debug::create_messenger(&self.entry, instance)
    }

    fn destroy_messenger(&self, instance: &ash::Instance, messenger: DebugMessenger) -> bool {
        debug::destroy_messenger(&self.entry, instance, messenger)
    }

    fn physical_devices(
        &self,
        instance: &ash::Instance,
    ) -> Result<Vec<PhysicalDeviceDescriptor>, BootstrapError> {
        device::enumerate_physical_devices(instance)
    }

    fn destroy_instance(&self, instance: ash::Instance) {
        unsafe { instance.destroy_instance(None) };
    }
}
