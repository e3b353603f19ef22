// Backend module - Vulkan bootstrap
//
// Design: every raw Vulkan call sits behind the `Backend` trait; the
// resolver, selector and lifecycle logic above it are plain Rust.
// Production uses `VulkanLoader` (ash); tests use an instrumented mock.

pub mod capabilities;
pub mod debug;
pub mod device;
pub mod error;
pub mod features;
pub mod instance;
pub mod lifecycle;
pub mod loader;
pub mod requirements;

#[cfg(test)]
pub(crate) mod mock;

pub use capabilities::{CapabilitySet, ExtensionRecord, LayerRecord};
pub use device::{
    AcceptAny, AllOf, DeviceSelector, PhysicalDeviceDescriptor, RequireGraphicsQueue,
    RequiredDeviceExtensions, RequiredFeatures, SelectionStrategy, SuitabilityPolicy,
};
pub use error::{BootstrapError, Diagnostic, MessengerError, Tier};
pub use instance::{ApiVersion, InstanceConfig};
pub use lifecycle::VulkanContext;
pub use loader::VulkanLoader;
pub use requirements::ResolvedRequirements;

/// The graphics backend as seen by the bootstrap sequence.
///
/// Handles are associated types so the lifecycle code owns them without
/// knowing what they are.
pub trait Backend {
    type Instance;
    type Messenger;

    /// Instance extensions supported by the loader and implicit layers
    fn instance_extensions(&self) -> Result<Vec<ExtensionRecord>, BootstrapError>;

    /// Layers available on the host
    fn instance_layers(&self) -> Result<Vec<LayerRecord>, BootstrapError>;

    fn create_instance(
        &self,
        config: &InstanceConfig,
        resolved: &ResolvedRequirements,
        chain_messenger: bool,
    ) -> Result<Self::Instance, BootstrapError>;

    fn create_messenger(&self, instance: &Self::Instance) -> Result<Self::Messenger, MessengerError>;

    /// Returns false if the destroy entry point could not be resolved
    fn destroy_messenger(&self, instance: &Self::Instance, messenger: Self::Messenger) -> bool;

    fn physical_devices(
        &self,
        instance: &Self::Instance,
    ) -> Result<Vec<PhysicalDeviceDescriptor>, BootstrapError>;

    fn destroy_instance(&self, instance: Self::Instance);
}
