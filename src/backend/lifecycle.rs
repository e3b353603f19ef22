// Lifecycle - bootstrap sequence and teardown ordering
//
// Construction order: capabilities -> requirements -> instance -> messenger
// -> physical device. Teardown runs in one place (InstanceScope::teardown):
// messenger first, then instance. A failure after the instance exists still
// tears down through the same routine when the scope is dropped.

use super::capabilities::CapabilitySet;
use super::device::{DeviceSelector, PhysicalDeviceDescriptor};
use super::instance::{InstanceConfig, DEBUG_UTILS_EXTENSION};
use super::requirements::ResolvedRequirements;
use super::{Backend, BootstrapError, Diagnostic, MessengerError};

/// Sole owner of the instance and its messenger
pub struct InstanceScope<B: Backend> {
    messenger: Option<B::Messenger>,
    instance: Option<B::Instance>,
    backend: B,
}

impl<B: Backend> InstanceScope<B> {
    fn new(backend: B, instance: B::Instance) -> Self {
        Self {
            messenger: None,
            instance: Some(instance),
            backend,
        }
    }

    fn attach_messenger(&mut self) -> Result<(), MessengerError> {
        let Some(instance) = self.instance.as_ref() else {
            return Ok(());
        };
        let messenger = self.backend.create_messenger(instance)?;
        self.messenger = Some(messenger);
        Ok(())
    }

    fn physical_devices(&self) -> Result<Vec<PhysicalDeviceDescriptor>, BootstrapError> {
        match self.instance.as_ref() {
            Some(instance) => self.backend.physical_devices(instance),
            None => Ok(Vec::new()),
        }
    }

    /// Destroy the messenger (if any), then the instance. Idempotent.
    ///
    /// Returns the silent-tier diagnostic when the messenger could not be
    /// destroyed because its entry point is missing.
    pub fn teardown(&mut self) -> Option<Diagnostic> {
        let instance = self.instance.take()?;
        let mut skipped = None;

        if let Some(messenger) = self.messenger.take() {
            if self.backend.destroy_messenger(&instance, messenger) {
                log::debug!("Destroyed debug messenger");
            } else {
                log::trace!("{}", Diagnostic::MessengerDestroySkipped);
                skipped = Some(Diagnostic::MessengerDestroySkipped);
            }
        }

        self.backend.destroy_instance(instance);
        log::info!("Destroyed Vulkan instance");
        skipped
    }
}

impl<B: Backend> Drop for InstanceScope<B> {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

/// A bootstrapped Vulkan instance with its selected physical device
pub struct VulkanContext<B: Backend> {
    physical_device: PhysicalDeviceDescriptor,
    resolved: ResolvedRequirements,
    diagnostics: Vec<Diagnostic>,
    scope: InstanceScope<B>,
}

impl<B: Backend> VulkanContext<B> {
    /// Run the whole bootstrap sequence.
    ///
    /// Fatal conditions come back as `Err`; degraded ones are logged and
    /// collected in `diagnostics()`.
    pub fn bootstrap(
        backend: B,
        config: &InstanceConfig,
        selector: &DeviceSelector,
    ) -> Result<Self, BootstrapError> {
        log::info!("Bootstrapping Vulkan for {}", config.application_name());

        // Step 1: What does the host support?
        let capabilities = CapabilitySet::query(&backend)?;

        // Step 2: Enable what we can
        let resolved = ResolvedRequirements::resolve(config, &capabilities)?;
        let mut diagnostics = resolved.diagnostics().to_vec();

        let use_messenger = config.validation() && resolved.has_extension(DEBUG_UTILS_EXTENSION);
        if config.validation() && !use_messenger {
            log::info!("{}", Diagnostic::MessengerSkipped);
            diagnostics.push(Diagnostic::MessengerSkipped);
        }

        // Step 3: Create instance
        let instance = backend
            .create_instance(config, &resolved, use_messenger)
            .inspect_err(|e| log::error!("{}", e))?;
        let mut scope = InstanceScope::new(backend, instance);
        log::info!("Created Vulkan instance (api {})", config.api_version());

        // Step 4: Attach debug messenger (optional)
        if use_messenger {
            match scope.attach_messenger() {
                Ok(()) => log::info!("Debug messenger attached"),
                Err(e) => {
                    let diagnostic = Diagnostic::MessengerUnavailable(e);
                    log::warn!("{}", diagnostic);
                    diagnostics.push(diagnostic);
                }
            }
        }

        // Step 5: Pick physical device (GPU)
        let devices = scope.physical_devices()?;
        let physical_device = selector.select(devices)?;

        Ok(Self {
            physical_device,
            resolved,
            diagnostics,
            scope,
        })
    }

    pub fn physical_device(&self) -> &PhysicalDeviceDescriptor {
        &self.physical_device
    }

    pub fn enabled_extensions(&self) -> &[String] {
        self.resolved.extensions()
    }

    pub fn enabled_layers(&self) -> &[String] {
        self.resolved.layers()
    }

    pub fn has_messenger(&self) -> bool {
        self.scope.messenger.is_some()
    }

    #[cfg(test)]
    pub fn instance(&self) -> Option<&B::Instance> {
        self.scope.instance.as_ref()
    }

    /// Degraded conditions hit during bootstrap
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Tear down explicitly instead of waiting for drop
    pub fn shutdown(mut self) -> Option<Diagnostic> {
        self.scope.teardown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::device::test_device;
    use crate::backend::instance::VALIDATION_LAYER;
    use crate::backend::mock::{Call, MockBackend, MockInstance};
    use ash::vk;

    const XCB: [&str; 2] = ["VK_KHR_surface", "VK_KHR_xcb_surface"];

    fn config() -> InstanceConfig {
        InstanceConfig::builder("test")
            .window_extensions(XCB, false)
            .validation([VALIDATION_LAYER], false)
            .build()
    }

    fn full_host() -> MockBackend {
        MockBackend::new()
            .with_extensions(&[
                "VK_KHR_surface",
                "VK_KHR_xcb_surface",
                "VK_EXT_debug_utils",
                "VK_KHR_get_physical_device_properties2",
            ])
            .with_layers(&[VALIDATION_LAYER])
            .with_devices(vec![
                test_device("GeForce", vk::PhysicalDeviceType::DISCRETE_GPU),
                test_device("llvmpipe", vk::PhysicalDeviceType::CPU),
            ])
    }

    fn position(calls: &[Call], wanted: &Call) -> usize {
        calls
            .iter()
            .position(|c| c == wanted)
            .unwrap_or_else(|| panic!("{:?} not called", wanted))
    }

    #[test]
    fn full_bootstrap_and_ordered_teardown() {
        let backend = full_host();
        let calls = backend.calls();

        let ctx = VulkanContext::bootstrap(backend, &config(), &DeviceSelector::default()).unwrap();

        assert_eq!(
            ctx.enabled_extensions(),
            ["VK_KHR_surface", "VK_KHR_xcb_surface", "VK_EXT_debug_utils"]
        );
        assert_eq!(ctx.enabled_layers(), [VALIDATION_LAYER]);
        assert!(ctx.has_messenger());
        assert!(ctx.diagnostics().is_empty());
        assert_eq!(ctx.physical_device().name, "GeForce");
        assert_eq!(ctx.instance(), Some(&MockInstance(1)));

        drop(ctx);

        let calls = calls.borrow();
        assert_eq!(
            calls[0],
            Call::CreateInstance {
                extensions: vec![
                    "VK_KHR_surface".into(),
                    "VK_KHR_xcb_surface".into(),
                    "VK_EXT_debug_utils".into()
                ],
                layers: vec![VALIDATION_LAYER.into()],
                chained_messenger: true,
            }
        );
        let creates = calls
            .iter()
            .filter(|c| matches!(c, Call::CreateInstance { .. }))
            .count();
        assert_eq!(creates, 1);
        assert!(position(&calls, &Call::DestroyMessenger) < position(&calls, &Call::DestroyInstance));
        assert_eq!(calls.last(), Some(&Call::DestroyInstance));
    }

    #[test]
    fn missing_debug_utils_skips_messenger() {
        let backend = MockBackend::new()
            .with_extensions(&["VK_KHR_surface", "VK_KHR_xcb_surface"])
            .with_layers(&[VALIDATION_LAYER])
            .with_devices(vec![test_device("GeForce", vk::PhysicalDeviceType::DISCRETE_GPU)]);
        let calls = backend.calls();

        let ctx = VulkanContext::bootstrap(backend, &config(), &DeviceSelector::default()).unwrap();

        assert_eq!(ctx.enabled_extensions(), XCB);
        assert!(!ctx.has_messenger());
        assert_eq!(
            ctx.diagnostics(),
            [
                Diagnostic::UnsupportedExtension("VK_EXT_debug_utils".into()),
                Diagnostic::MessengerSkipped,
            ]
        );
        drop(ctx);

        let calls = calls.borrow();
        assert!(!calls.contains(&Call::CreateMessenger));
        assert!(!calls.contains(&Call::DestroyMessenger));
        assert!(matches!(
            &calls[0],
            Call::CreateInstance { chained_messenger: false, .. }
        ));
    }

    #[test]
    fn zero_devices_is_fatal_and_still_tears_down() {
        let backend = full_host().with_devices(Vec::new());
        let calls = backend.calls();

        let err = VulkanContext::bootstrap(backend, &config(), &DeviceSelector::default())
            .err()
            .unwrap();

        assert!(matches!(err, BootstrapError::NoPhysicalDevice));
        assert!(err.to_string().contains("no physical device found"));
        assert_eq!(err.exit_code(), 1);

        let calls = calls.borrow();
        assert!(position(&calls, &Call::DestroyMessenger) < position(&calls, &Call::DestroyInstance));
    }

    #[test]
    fn instance_creation_failure_is_fatal() {
        let backend = full_host().failing_instance(vk::Result::ERROR_INCOMPATIBLE_DRIVER);
        let calls = backend.calls();

        let err = VulkanContext::bootstrap(backend, &config(), &DeviceSelector::default())
            .err()
            .unwrap();

        assert!(matches!(
            err,
            BootstrapError::InstanceCreation(vk::Result::ERROR_INCOMPATIBLE_DRIVER)
        ));
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls.contains(&Call::DestroyInstance));
    }

    #[test]
    fn messenger_failure_is_degraded() {
        let backend = full_host()
            .failing_messenger(MessengerError::EntryPointMissing("vkCreateDebugUtilsMessengerEXT"));
        let calls = backend.calls();

        let ctx = VulkanContext::bootstrap(backend, &config(), &DeviceSelector::default()).unwrap();

        assert!(!ctx.has_messenger());
        assert_eq!(ctx.diagnostics().len(), 1);
        assert!(matches!(ctx.diagnostics()[0], Diagnostic::MessengerUnavailable(_)));
        assert_eq!(ctx.shutdown(), None);

        let calls = calls.borrow();
        assert!(!calls.contains(&Call::DestroyMessenger));
        assert_eq!(calls.last(), Some(&Call::DestroyInstance));
    }

    #[test]
    fn missing_destroy_entry_point_is_silent() {
        let backend = full_host().without_destroy_entry_point();
        let calls = backend.calls();

        let ctx = VulkanContext::bootstrap(backend, &config(), &DeviceSelector::default()).unwrap();
        assert!(ctx.has_messenger());

        assert_eq!(ctx.shutdown(), Some(Diagnostic::MessengerDestroySkipped));
        assert_eq!(calls.borrow().last(), Some(&Call::DestroyInstance));
    }

    #[test]
    fn teardown_runs_once() {
        let backend = full_host();
        let calls = backend.calls();

        let ctx = VulkanContext::bootstrap(backend, &config(), &DeviceSelector::default()).unwrap();
        ctx.shutdown();

        let destroys = calls
            .borrow()
            .iter()
            .filter(|c| **c == Call::DestroyInstance)
            .count();
        assert_eq!(destroys, 1);
    }

    #[test]
    fn validation_disabled_requests_nothing_extra() {
        let backend = full_host();
        let calls = backend.calls();
        let config = InstanceConfig::builder("test").window_extensions(XCB, false).build();

        let ctx = VulkanContext::bootstrap(backend, &config, &DeviceSelector::default()).unwrap();

        assert!(!ctx.has_messenger());
        assert!(ctx.enabled_layers().is_empty());
        assert!(ctx.diagnostics().is_empty());
        drop(ctx);
        assert!(!calls.borrow().contains(&Call::CreateMessenger));
    }
}
