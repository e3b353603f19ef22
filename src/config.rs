// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Replaces fixed name tables: everything the bootstrap requests (layers,
// extra extensions, device requirements) comes from here.
// Provides sensible defaults if config file is missing or has errors.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::backend::instance::VALIDATION_LAYER;
use crate::backend::{
    AcceptAny, AllOf, ApiVersion, DeviceSelector, InstanceConfig, RequireGraphicsQueue,
    RequiredDeviceExtensions, RequiredFeatures, SelectionStrategy,
};

pub const CONFIG_PATH: &str = "config.toml";

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub application: ApplicationConfig,
    pub window: WindowConfig,
    pub validation: ValidationConfig,
    pub extensions: ExtensionsConfig,
    pub device: DeviceConfig,
    pub logging: LoggingConfig,
}

/// Application info passed to vkCreateInstance
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    pub engine_name: String,
    pub version: [u32; 3],
    pub engine_version: [u32; 3],
    pub api_version: [u32; 3],
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "Vulkan Bootstrap".to_string(),
            engine_name: "No Engine".to_string(),
            version: [1, 0, 0],
            engine_version: [1, 0, 0],
            api_version: [1, 0, 0],
        }
    }
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Bootstrap".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Validation layer settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Only honored in debug builds unless `force` is set
    pub enabled: bool,
    pub force: bool,
    /// Missing layers abort instead of being skipped
    pub required: bool,
    pub layers: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            force: false,
            required: false,
            layers: vec![VALIDATION_LAYER.to_string()],
        }
    }
}

/// Instance extension settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Additional application extensions (optional)
    pub extra: Vec<String>,
    /// Treat the window's surface extensions as mandatory
    pub strict_window: bool,
    /// Request VK_KHR_portability_enumeration (needed for MoltenVK)
    pub portability: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            extra: Vec::new(),
            strict_window: false,
            portability: cfg!(target_os = "macos"),
        }
    }
}

/// Physical device selection
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub selection: String,
    pub required_features: Vec<String>,
    /// Device extensions a GPU must expose, e.g. "VK_KHR_swapchain"
    pub required_extensions: Vec<String>,
    pub require_graphics_queue: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            selection: "first_suitable".to_string(),
            required_features: Vec::new(),
            required_extensions: Vec::new(),
            require_graphics_queue: false,
        }
    }
}

/// Log settings (RUST_LOG still wins)
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where the configuration came from.
///
/// Config is read before the logger exists, so the outcome is kept and
/// reported once logging is up.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    NotFound,
    Failed(anyhow::Error),
}

impl LoadOutcome {
    pub fn report(&self, path: &str) {
        match self {
            LoadOutcome::Loaded => log::info!("Loaded configuration from {:?}", path),
            LoadOutcome::NotFound => log::info!("Config file not found at {:?}, using defaults", path),
            LoadOutcome::Failed(e) => log::warn!("Failed to load {}: {:#}. Using defaults.", path, e),
        }
    }
}

impl Config {
    /// Load configuration from config.toml, falling back to defaults
    pub fn load() -> (Self, LoadOutcome) {
        Self::load_from_path(CONFIG_PATH)
    }

    /// Load configuration from a specific path, falling back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> (Self, LoadOutcome) {
        let path = path.as_ref();

        if !path.exists() {
            return (Config::default(), LoadOutcome::NotFound);
        }

        match Self::read(path) {
            Ok(config) => (config, LoadOutcome::Loaded),
            Err(e) => (Config::default(), LoadOutcome::Failed(e)),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Whether validation is actually turned on for this build
    pub fn validation_enabled(&self) -> bool {
        self.validation.enabled && (cfg!(debug_assertions) || self.validation.force)
    }

    /// Build the instance request from the config plus the window's required extensions
    pub fn instance_config(&self, window_extensions: &[String]) -> InstanceConfig {
        let mut builder = InstanceConfig::builder(&self.application.name)
            .engine_name(&self.application.engine_name)
            .application_version(ApiVersion::from(self.application.version))
            .engine_version(ApiVersion::from(self.application.engine_version))
            .api_version(ApiVersion::from(self.application.api_version))
            .window_extensions(window_extensions.iter().cloned(), self.extensions.strict_window);

        for name in &self.extensions.extra {
            builder = builder.extension(name, false);
        }

        builder = builder.portability_enumeration(self.extensions.portability);

        if self.validation_enabled() {
            builder = builder.validation(self.validation.layers.iter().cloned(), self.validation.required);
        }

        builder.build()
    }

    /// Get device selection strategy
    pub fn selection_strategy(&self) -> SelectionStrategy {
        match self.device.selection.to_lowercase().as_str() {
            "first_suitable" | "first" => SelectionStrategy::FirstSuitable,
            "highest_score" | "score" => SelectionStrategy::HighestScore,
            _ => {
                log::warn!(
                    "Unknown device selection '{}', defaulting to first_suitable",
                    self.device.selection
                );
                SelectionStrategy::FirstSuitable
            }
        }
    }

    /// Combine the configured device requirements; no requirements accepts any device
    pub fn device_selector(&self) -> DeviceSelector {
        let mut policy = AllOf::new();

        if self.device.require_graphics_queue {
            policy = policy.with(RequireGraphicsQueue);
        }
        if !self.device.required_extensions.is_empty() {
            policy = policy.with(RequiredDeviceExtensions::new(
                self.device.required_extensions.iter().cloned(),
            ));
        }
        let features = RequiredFeatures::new(self.device.required_features.iter().cloned());
        if !features.names().is_empty() {
            policy = policy.with(features);
        }

        if policy.is_empty() {
            DeviceSelector::new(AcceptAny, self.selection_strategy())
        } else {
            DeviceSelector::new(policy, self.selection_strategy())
        }
    }

    /// Get log level filter
    pub fn log_level(&self) -> log::LevelFilter {
        self.logging.level.parse().unwrap_or_else(|_| {
            eprintln!(
                "Unknown log level '{}', defaulting to info",
                self.logging.level
            );
            log::LevelFilter::Info
        })
    }
}
