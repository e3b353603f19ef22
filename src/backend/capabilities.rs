// Capability query - what the host's Vulkan loader supports
//
// Queried fresh on every run, never cached.

use super::{Backend, BootstrapError};

/// One supported instance extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRecord {
    pub name: String,
    pub spec_version: u32,
}

/// One available instance layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRecord {
    pub name: String,
    pub spec_version: u32,
    pub implementation_version: u32,
    pub description: String,
}

/// Everything the loader reports as available before an instance exists
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    pub extensions: Vec<ExtensionRecord>,
    pub layers: Vec<LayerRecord>,
}

impl CapabilitySet {
    /// Query the backend for supported extensions and layers.
    ///
    /// An empty set is a legitimate (if unusual) answer; only a failing
    /// enumeration call is an error.
    pub fn query<B: Backend>(backend: &B) -> Result<Self, BootstrapError> {
        let extensions = backend.instance_extensions()?;
        let layers = backend.instance_layers()?;

        let capabilities = Self { extensions, layers };
        capabilities.log();
        Ok(capabilities)
    }

    pub fn supports_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext.name == name)
    }

    pub fn supports_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer.name == name)
    }

    fn log(&self) {
        log::debug!("Supported instance extensions: {}", self.extensions.len());
        for ext in &self.extensions {
            log::debug!("   extension: {:<40} (0x{:08X})", ext.name, ext.spec_version);
        }

        log::debug!("Available layers: {}", self.layers.len());
        for layer in &self.layers {
            log::debug!(
                "   layer: {:<40} (spec 0x{:08X}, impl {})",
                layer.name,
                layer.spec_version,
                layer.implementation_version
            );
            log::debug!("      desc: {}", layer.description);
        }
    }
}
