// Instrumented in-memory backend for tests

use ash::vk;
use std::cell::RefCell;
use std::rc::Rc;

use super::instance::InstanceConfig;
use super::requirements::ResolvedRequirements;
use super::{
    Backend, BootstrapError, ExtensionRecord, LayerRecord, MessengerError, PhysicalDeviceDescriptor,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    CreateInstance {
        extensions: Vec<String>,
        layers: Vec<String>,
        chained_messenger: bool,
    },
    CreateMessenger,
    DestroyMessenger,
    EnumerateDevices,
    DestroyInstance,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct MockInstance(pub u32);

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct MockMessenger;

pub(crate) struct MockBackend {
    extensions: Vec<ExtensionRecord>,
    layers: Vec<LayerRecord>,
    devices: Vec<PhysicalDeviceDescriptor>,
    instance_result: Option<vk::Result>,
    messenger_error: Option<MessengerError>,
    destroy_entry_point: bool,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            extensions: Vec::new(),
            layers: Vec::new(),
            devices: Vec::new(),
            instance_result: None,
            messenger_error: None,
            destroy_entry_point: true,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_extensions(mut self, names: &[&str]) -> Self {
        self.extensions = names
            .iter()
            .map(|name| ExtensionRecord {
                name: name.to_string(),
                spec_version: 1,
            })
            .collect();
        self
    }

    pub fn with_layers(mut self, names: &[&str]) -> Self {
        self.layers = names
            .iter()
            .map(|name| LayerRecord {
                name: name.to_string(),
                spec_version: 1,
                implementation_version: 1,
                description: format!("{} (mock)", name),
            })
            .collect();
        self
    }

    pub fn with_devices(mut self, devices: Vec<PhysicalDeviceDescriptor>) -> Self {
        self.devices = devices;
        self
    }

    pub fn failing_instance(mut self, result: vk::Result) -> Self {
        self.instance_result = Some(result);
        self
    }

    pub fn failing_messenger(mut self, error: MessengerError) -> Self {
        self.messenger_error = Some(error);
        self
    }

    pub fn without_destroy_entry_point(mut self) -> Self {
        self.destroy_entry_point = false;
        self
    }

    /// Shared call log, still readable after the backend is dropped
    pub fn calls(&self) -> Rc<RefCell<Vec<Call>>> {
        Rc::clone(&self.calls)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Backend for MockBackend {
    type Instance = MockInstance;
    type Messenger = MockMessenger;

    fn instance_extensions(&self) -> Result<Vec<ExtensionRecord>, BootstrapError> {
        Ok(self.extensions.clone())
    }

    fn instance_layers(&self) -> Result<Vec<LayerRecord>, BootstrapError> {
        Ok(self.layers.clone())
    }

    fn create_instance(
        &self,
        _config: &InstanceConfig,
        resolved: &ResolvedRequirements,
        chain_messenger: bool,
    ) -> Result<MockInstance, BootstrapError> {
        self.record(Call::CreateInstance {
            extensions: resolved.extensions().to_vec(),
            layers: resolved.layers().to_vec(),
            chained_messenger: chain_messenger,
        });
        match self.instance_result {
            Some(result) => Err(BootstrapError::InstanceCreation(result)),
            None => Ok(MockInstance(1)),
        }
    }

    fn create_messenger(&self, _instance: &MockInstance) -> Result<MockMessenger, MessengerError> {
        self.record(Call::CreateMessenger);
        match &self.messenger_error {
            Some(err) => Err(err.clone()),
            None => Ok(MockMessenger),
        }
    }

    fn destroy_messenger(&self, _instance: &MockInstance, _messenger: MockMessenger) -> bool {
        if self.destroy_entry_point {
            self.record(Call::DestroyMessenger);
        }
        self.destroy_entry_point
    }

    fn physical_devices(
        &self,
        _instance: &MockInstance,
    ) -> Result<Vec<PhysicalDeviceDescriptor>, BootstrapError> {
        self.record(Call::EnumerateDevices);
        Ok(self.devices.clone())
    }

    fn destroy_instance(&self, _instance: MockInstance) {
        self.record(Call::DestroyInstance);
    }
}
