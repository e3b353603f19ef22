// Requirement resolution - requested names intersected with what the host supports
//
// Policy: enable what you can, warn about the rest. Only requirements marked
// mandatory abort the bootstrap when they are missing.

use super::capabilities::CapabilitySet;
use super::instance::{InstanceConfig, Requirement, RequirementSource};
use super::{BootstrapError, Diagnostic};

/// Names actually enabled on the instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRequirements {
    extensions: Vec<String>,
    layers: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ResolvedRequirements {
    pub fn resolve(
        config: &InstanceConfig,
        capabilities: &CapabilitySet,
    ) -> Result<Self, BootstrapError> {
        let (extensions, missing_extensions) =
            enable_supported(config.extensions(), |name| capabilities.supports_extension(name));
        let (layers, missing_layers) =
            enable_supported(config.layers(), |name| capabilities.supports_layer(name));

        let mut diagnostics = Vec::new();

        for req in missing_extensions {
            if req.mandatory {
                log::error!("unable to locate required extension {:?}", req.name);
                return Err(BootstrapError::MissingExtension(req.name.clone()));
            }
            log::warn!(
                "unable to locate requested extension {:?} ({})",
                req.name,
                source_label(req.source)
            );
            diagnostics.push(Diagnostic::UnsupportedExtension(req.name.clone()));
        }

        for req in missing_layers {
            if req.mandatory {
                log::error!("unable to locate required layer {:?}", req.name);
                return Err(BootstrapError::MissingValidationLayer(req.name.clone()));
            }
            log::warn!("unable to locate requested layer {:?}", req.name);
            diagnostics.push(Diagnostic::UnsupportedLayer(req.name.clone()));
        }

        Ok(Self {
            extensions,
            layers,
            diagnostics,
        })
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext == name)
    }

    /// Degraded-tier conditions hit while resolving, one per skipped name
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Split requests into enabled names (first-seen order, no duplicates) and
/// unsupported requests (each reported once).
fn enable_supported<'a>(
    requested: &'a [Requirement],
    supported: impl Fn(&str) -> bool,
) -> (Vec<String>, Vec<&'a Requirement>) {
    let mut enabled: Vec<String> = Vec::new();
    let mut missing: Vec<&Requirement> = Vec::new();

    for req in requested {
        if supported(&req.name) {
            if !enabled.contains(&req.name) {
                enabled.push(req.name.clone());
            }
        } else if !missing.iter().any(|m| m.name == req.name) {
            missing.push(req);
        }
    }

    (enabled, missing)
}

fn source_label(source: RequirementSource) -> &'static str {
    match source {
        RequirementSource::Window => "window",
        RequirementSource::Application => "application",
        RequirementSource::Validation => "validation",
        RequirementSource::Portability => "portability",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::capabilities::{ExtensionRecord, LayerRecord};
    use crate::backend::instance::{DEBUG_UTILS_EXTENSION, VALIDATION_LAYER};

    fn capabilities(extensions: &[&str], layers: &[&str]) -> CapabilitySet {
        CapabilitySet {
            extensions: extensions
                .iter()
                .map(|name| ExtensionRecord {
                    name: name.to_string(),
                    spec_version: 1,
                })
                .collect(),
            layers: layers
                .iter()
                .map(|name| LayerRecord {
                    name: name.to_string(),
                    spec_version: 1,
                    implementation_version: 1,
                    description: String::new(),
                })
                .collect(),
        }
    }

    fn xcb_config() -> InstanceConfig {
        InstanceConfig::builder("test")
            .window_extensions(["VK_KHR_surface", "VK_KHR_xcb_surface"], false)
            .validation([VALIDATION_LAYER], false)
            .build()
    }

    #[test]
    fn everything_supported_enables_everything_in_order() {
        let caps = capabilities(
            &[
                "VK_KHR_surface",
                "VK_KHR_xcb_surface",
                "VK_EXT_debug_utils",
                "VK_KHR_get_physical_device_properties2",
            ],
            &[VALIDATION_LAYER],
        );

        let resolved = ResolvedRequirements::resolve(&xcb_config(), &caps).unwrap();

        assert_eq!(
            resolved.extensions(),
            ["VK_KHR_surface", "VK_KHR_xcb_surface", "VK_EXT_debug_utils"]
        );
        assert_eq!(resolved.layers(), [VALIDATION_LAYER]);
        assert!(resolved.diagnostics().is_empty());
    }

    #[test]
    fn missing_debug_utils_is_skipped_with_one_warning() {
        let caps = capabilities(
            &[
                "VK_KHR_surface",
                "VK_KHR_xcb_surface",
                "VK_KHR_get_physical_device_properties2",
            ],
            &[VALIDATION_LAYER],
        );

        let resolved = ResolvedRequirements::resolve(&xcb_config(), &caps).unwrap();

        assert_eq!(resolved.extensions(), ["VK_KHR_surface", "VK_KHR_xcb_surface"]);
        assert!(!resolved.has_extension(DEBUG_UTILS_EXTENSION));
        assert_eq!(
            resolved.diagnostics(),
            [Diagnostic::UnsupportedExtension(DEBUG_UTILS_EXTENSION.to_string())]
        );
    }

    #[test]
    fn enabled_is_a_subset_of_requested_and_supported() {
        let config = InstanceConfig::builder("test")
            .window_extensions(["A", "B", "C"], false)
            .extension("D", false)
            .extension("B", false)
            .build();
        let caps = capabilities(&["D", "B", "X", "A"], &[]);

        let resolved = ResolvedRequirements::resolve(&config, &caps).unwrap();

        assert_eq!(resolved.extensions(), ["A", "B", "D"]);
        for name in resolved.extensions() {
            assert!(config.extensions().iter().any(|r| &r.name == name));
            assert!(caps.supports_extension(name));
        }
        assert_eq!(resolved.diagnostics().len(), 1);
    }

    #[test]
    fn missing_optional_layer_is_degraded() {
        let resolved = ResolvedRequirements::resolve(&xcb_config(), &capabilities(&[], &[])).unwrap();

        assert!(resolved.layers().is_empty());
        assert!(resolved
            .diagnostics()
            .contains(&Diagnostic::UnsupportedLayer(VALIDATION_LAYER.to_string())));
    }

    #[test]
    fn missing_required_layer_is_fatal() {
        let config = InstanceConfig::builder("test")
            .validation([VALIDATION_LAYER], true)
            .build();

        let err = ResolvedRequirements::resolve(&config, &capabilities(&[DEBUG_UTILS_EXTENSION], &[]))
            .unwrap_err();

        assert!(matches!(err, BootstrapError::MissingValidationLayer(name) if name == VALIDATION_LAYER));
    }

    #[test]
    fn strict_window_extension_is_fatal_when_missing() {
        let config = InstanceConfig::builder("test")
            .window_extensions(["VK_KHR_surface", "VK_KHR_wayland_surface"], true)
            .build();

        let err = ResolvedRequirements::resolve(&config, &capabilities(&["VK_KHR_surface"], &[]))
            .unwrap_err();

        assert!(matches!(err, BootstrapError::MissingExtension(name) if name == "VK_KHR_wayland_surface"));
    }
}
