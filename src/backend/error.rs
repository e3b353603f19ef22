// Error and diagnostic types for the bootstrap sequence
//
// Three tiers:
// - Fatal: BootstrapError, the process reports it and exits
// - Degraded: Diagnostic, logged as a warning, bootstrap continues
// - Silent: nothing to do and nothing worth telling the user

use ash::vk;
use thiserror::Error;

/// How a failure affects the rest of the bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fatal,
    Degraded,
    Silent,
}

/// Unrecoverable bootstrap failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to load the Vulkan library: {0}")]
    Loader(#[from] ash::LoadingError),

    #[error("failed to enumerate {what}: {result}")]
    Enumeration {
        what: &'static str,
        result: vk::Result,
    },

    #[error("invalid name {0:?}: contains an interior nul byte")]
    InvalidName(String),

    #[error("unable to create Vulkan instance: {0}")]
    InstanceCreation(vk::Result),

    #[error("required extension {0:?} is not supported")]
    MissingExtension(String),

    #[error("validation layer {0:?} was requested but is not available")]
    MissingValidationLayer(String),

    #[error("no physical device found")]
    NoPhysicalDevice,

    #[error("no suitable physical device found among {0} candidate(s)")]
    NoSuitableDevice(usize),

    #[error("unsupported display platform: {0}")]
    UnsupportedDisplay(String),

    #[error("failed to create window: {0}")]
    WindowCreation(String),
}

impl BootstrapError {
    pub fn tier(&self) -> Tier {
        Tier::Fatal
    }

    /// Process exit code used when this error terminates the program
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Why the debug messenger could not be attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    #[error("entry point {0} could not be resolved")]
    EntryPointMissing(&'static str),

    #[error("messenger creation failed: {0}")]
    Creation(vk::Result),
}

/// Recoverable conditions collected while bootstrapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("unable to locate requested extension {0:?}")]
    UnsupportedExtension(String),

    #[error("unable to locate requested layer {0:?}")]
    UnsupportedLayer(String),

    #[error("debug messenger unavailable: {0}")]
    MessengerUnavailable(MessengerError),

    #[error("validation enabled but debug utils extension not enabled, skipping messenger")]
    MessengerSkipped,

    #[error("messenger destroy entry point missing, nothing to destroy")]
    MessengerDestroySkipped,
}

impl Diagnostic {
    pub fn tier(&self) -> Tier {
        match self {
            Diagnostic::MessengerDestroySkipped => Tier::Silent,
            _ => Tier::Degraded,
        }
    }
}
