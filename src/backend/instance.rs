// Vulkan Instance - application info + enabled extensions/layers
//
// Responsibilities:
// - Immutable description of what the application asks for (InstanceConfig)
// - Instance creation from the resolved name lists
// - Chaining the debug messenger create info so messages emitted during
//   vkCreateInstance itself are not lost

use ash::{vk, Entry};
use std::ffi::{c_char, CString};

use super::debug;
use super::requirements::ResolvedRequirements;
use super::BootstrapError;

/// Name of the debug utils instance extension
pub const DEBUG_UTILS_EXTENSION: &str = "VK_EXT_debug_utils";
/// Name of the Khronos validation layer
pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";
/// Name of the portability enumeration instance extension (MoltenVK)
pub const PORTABILITY_ENUMERATION_EXTENSION: &str = "VK_KHR_portability_enumeration";

/// `major.minor.patch` triple, packed into the Vulkan version encoding on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub const V1_0: ApiVersion = ApiVersion::new(1, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    pub fn to_vk(self) -> u32 {
        vk::make_api_version(0, self.major, self.minor, self.patch)
    }

    pub fn from_vk(version: u32) -> Self {
        Self {
            major: vk::api_version_major(version),
            minor: vk::api_version_minor(version),
            patch: vk::api_version_patch(version),
        }
    }
}

impl From<[u32; 3]> for ApiVersion {
    fn from([major, minor, patch]: [u32; 3]) -> Self {
        Self::new(major, minor, patch)
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Who asked for an extension or layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementSource {
    Window,
    Application,
    Validation,
    Portability,
}

/// A requested extension or layer name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub source: RequirementSource,
    /// Absent mandatory requirements abort the bootstrap instead of being skipped
    pub mandatory: bool,
}

/// Everything needed to create the instance. Built once, then read-only.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    application_name: String,
    engine_name: String,
    application_version: ApiVersion,
    engine_version: ApiVersion,
    api_version: ApiVersion,
    extensions: Vec<Requirement>,
    layers: Vec<Requirement>,
    validation: bool,
}

impl InstanceConfig {
    pub fn builder(application_name: impl Into<String>) -> InstanceConfigBuilder {
        InstanceConfigBuilder {
            config: InstanceConfig {
                application_name: application_name.into(),
                engine_name: "No Engine".to_string(),
                application_version: ApiVersion::new(1, 0, 0),
                engine_version: ApiVersion::new(1, 0, 0),
                api_version: ApiVersion::V1_0,
                extensions: Vec::new(),
                layers: Vec::new(),
                validation: false,
            },
        }
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn application_version(&self) -> ApiVersion {
        self.application_version
    }

    pub fn engine_version(&self) -> ApiVersion {
        self.engine_version
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Requested extensions in request order (window first, then application)
    pub fn extensions(&self) -> &[Requirement] {
        &self.extensions
    }

    pub fn layers(&self) -> &[Requirement] {
        &self.layers
    }

    pub fn validation(&self) -> bool {
        self.validation
    }
}

pub struct InstanceConfigBuilder {
    config: InstanceConfig,
}

impl InstanceConfigBuilder {
    pub fn engine_name(mut self, name: impl Into<String>) -> Self {
        self.config.engine_name = name.into();
        self
    }

    pub fn application_version(mut self, version: ApiVersion) -> Self {
        self.config.application_version = version;
        self
    }

    pub fn engine_version(mut self, version: ApiVersion) -> Self {
        self.config.engine_version = version;
        self
    }

    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.config.api_version = version;
        self
    }

    /// Request the extensions the windowing layer needs to create a surface
    pub fn window_extensions<I, S>(mut self, names: I, mandatory: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            push_unique(
                &mut self.config.extensions,
                name.into(),
                RequirementSource::Window,
                mandatory,
            );
        }
        self
    }

    pub fn extension(mut self, name: impl Into<String>, mandatory: bool) -> Self {
        push_unique(
            &mut self.config.extensions,
            name.into(),
            RequirementSource::Application,
            mandatory,
        );
        self
    }

    /// Request the portability enumeration extension (optional)
    pub fn portability_enumeration(mut self, enabled: bool) -> Self {
        if enabled {
            push_unique(
                &mut self.config.extensions,
                PORTABILITY_ENUMERATION_EXTENSION.to_string(),
                RequirementSource::Portability,
                false,
            );
        }
        self
    }

    /// Enable validation: requests the given layers plus the debug utils
    /// extension the messenger needs.
    ///
    /// With `required` set, a missing layer is fatal instead of skipped.
    pub fn validation<I, S>(mut self, layers: I, required: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.validation = true;
        push_unique(
            &mut self.config.extensions,
            DEBUG_UTILS_EXTENSION.to_string(),
            RequirementSource::Validation,
            false,
        );
        for layer in layers {
            push_unique(
                &mut self.config.layers,
                layer.into(),
                RequirementSource::Validation,
                required,
            );
        }
        self
    }

    pub fn build(self) -> InstanceConfig {
        self.config
    }
}

// First occurrence keeps its position; a later mandatory duplicate upgrades it.
fn push_unique(
    list: &mut Vec<Requirement>,
    name: String,
    source: RequirementSource,
    mandatory: bool,
) {
    match list.iter_mut().find(|req| req.name == name) {
        Some(existing) => existing.mandatory |= mandatory,
        None => list.push(Requirement {
            name,
            source,
            mandatory,
        }),
    }
}

fn to_cstrings(names: &[String]) -> Result<Vec<CString>, BootstrapError> {
    names
        .iter()
        .map(|name| CString::new(name.as_str()).map_err(|_| BootstrapError::InvalidName(name.clone())))
        .collect()
}

/// Create the Vulkan instance from the resolved name lists.
///
/// `chain_messenger` chains the same messenger create info used by the
/// standalone messenger onto instance creation.
pub fn create_instance(
    entry: &Entry,
    config: &InstanceConfig,
    resolved: &ResolvedRequirements,
    chain_messenger: bool,
) -> Result<ash::Instance, BootstrapError> {
    let app_name = CString::new(config.application_name())
        .map_err(|_| BootstrapError::InvalidName(config.application_name().to_string()))?;
    let engine_name = CString::new(config.engine_name())
        .map_err(|_| BootstrapError::InvalidName(config.engine_name().to_string()))?;

    let app_info = vk::ApplicationInfo::builder()
        .application_name(&app_name)
        .application_version(config.application_version().to_vk())
        .engine_name(&engine_name)
        .engine_version(config.engine_version().to_vk())
        .api_version(config.api_version().to_vk());

    let extension_names = to_cstrings(resolved.extensions())?;
    let extension_ptrs: Vec<*const c_char> = extension_names.iter().map(|n| n.as_ptr()).collect();
    let layer_names = to_cstrings(resolved.layers())?;
    let layer_ptrs: Vec<*const c_char> = layer_names.iter().map(|n| n.as_ptr()).collect();

    log::info!("Enabled instance extensions: {}", resolved.extensions().len());
    for name in resolved.extensions() {
        log::info!("   extension: {}", name);
    }
    log::info!("Enabled layers: {}", resolved.layers().len());
    for name in resolved.layers() {
        log::info!("   layer: {}", name);
    }

    let flags = if resolved.has_extension(PORTABILITY_ENUMERATION_EXTENSION) {
        vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
    } else {
        vk::InstanceCreateFlags::empty()
    };

    let mut messenger_info = debug::messenger_create_info();

    let mut create_info = vk::InstanceCreateInfo::builder()
        .flags(flags)
        .application_info(&app_info)
        .enabled_extension_names(&extension_ptrs)
        .enabled_layer_names(&layer_ptrs);

    if chain_messenger {
        create_info = create_info.push_next(&mut messenger_info);
    }

    let instance = unsafe { entry.create_instance(&create_info, None) }
        .map_err(BootstrapError::InstanceCreation)?;

    Ok(instance)
}
