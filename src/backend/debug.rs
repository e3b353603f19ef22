// Debug messenger - validation layer output routed into the log
//
// The create/destroy entry points belong to VK_EXT_debug_utils and are not
// guaranteed to exist, so both are looked up through vkGetInstanceProcAddr
// and handled as optional.

use ash::{vk, Entry};
use std::borrow::Cow;
use std::ffi::{c_void, CStr};

use super::MessengerError;

const CREATE_MESSENGER_FN: &CStr = c"vkCreateDebugUtilsMessengerEXT";
const DESTROY_MESSENGER_FN: &CStr = c"vkDestroyDebugUtilsMessengerEXT";

/// Severities the messenger subscribes to
pub const MESSAGE_SEVERITIES: vk::DebugUtilsMessageSeverityFlagsEXT =
    vk::DebugUtilsMessageSeverityFlagsEXT::from_raw(
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE.as_raw()
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO.as_raw()
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING.as_raw()
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR.as_raw(),
    );

/// Message types the messenger subscribes to
pub const MESSAGE_TYPES: vk::DebugUtilsMessageTypeFlagsEXT =
    vk::DebugUtilsMessageTypeFlagsEXT::from_raw(
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL.as_raw()
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION.as_raw()
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE.as_raw(),
    );

/// Messenger create info shared by the standalone messenger and the
/// instance-creation chain, so both use the same filter.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(MESSAGE_SEVERITIES)
        .message_type(MESSAGE_TYPES)
        .pfn_user_callback(Some(debug_callback))
        .build()
}

/// Live messenger handle, owned by the instance's lifetime scope
#[derive(Debug)]
pub struct DebugMessenger {
    pub handle: vk::DebugUtilsMessengerEXT,
}

unsafe fn instance_fn<F: Copy>(entry: &Entry, instance: vk::Instance, name: &CStr) -> Option<F> {
    let raw = (entry.static_fn().get_instance_proc_addr)(instance, name.as_ptr())?;
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of_val(&raw));
    Some(std::mem::transmute_copy(&raw))
}

/// Resolve `vkCreateDebugUtilsMessengerEXT`, if the instance exposes it
pub fn lookup_create_fn(
    entry: &Entry,
    instance: &ash::Instance,
) -> Option<vk::PFN_vkCreateDebugUtilsMessengerEXT> {
    unsafe { instance_fn(entry, instance.handle(), CREATE_MESSENGER_FN) }
}

/// Resolve `vkDestroyDebugUtilsMessengerEXT`, if the instance exposes it
pub fn lookup_destroy_fn(
    entry: &Entry,
    instance: &ash::Instance,
) -> Option<vk::PFN_vkDestroyDebugUtilsMessengerEXT> {
    unsafe { instance_fn(entry, instance.handle(), DESTROY_MESSENGER_FN) }
}

pub fn create_messenger(
    entry: &Entry,
    instance: &ash::Instance,
) -> Result<DebugMessenger, MessengerError> {
    let create = lookup_create_fn(entry, instance)
        .ok_or(MessengerError::EntryPointMissing("vkCreateDebugUtilsMessengerEXT"))?;

    let create_info = messenger_create_info();
    let mut handle = vk::DebugUtilsMessengerEXT::null();
    let result = unsafe { create(instance.handle(), &create_info, std::ptr::null(), &mut handle) };

    if result != vk::Result::SUCCESS {
        return Err(MessengerError::Creation(result));
    }

    Ok(DebugMessenger { handle })
}

/// Destroy the messenger. Returns false when the entry point is missing,
/// in which case there is nothing to destroy.
pub fn destroy_messenger(entry: &Entry, instance: &ash::Instance, messenger: DebugMessenger) -> bool {
    match lookup_destroy_fn(entry, instance) {
        Some(destroy) => {
            unsafe { destroy(instance.handle(), messenger.handle, std::ptr::null()) };
            true
        }
        None => false,
    }
}

/// Log level a validation message is reported at
pub fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}

fn type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else {
        "general"
    }
}

unsafe fn lossy<'a>(ptr: *const std::ffi::c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

// Debug callback for validation layers. May run on any thread; only logs.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let data = &*p_callback_data;
    let id_name = lossy(data.p_message_id_name);
    let message = lossy(data.p_message);

    log::log!(
        target: "vulkan",
        severity_level(message_severity),
        "[{}] [{} ({})] {}",
        type_label(message_type),
        id_name,
        data.message_id_number,
        message
    );

    // Never abort the call that triggered the message
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn filter_covers_every_severity_and_type() {
        let info = messenger_create_info();
        assert!(info.message_severity.contains(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
        ));
        assert!(info.message_type.contains(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
        ));
        assert!(info.pfn_user_callback.is_some());
    }

    #[test]
    fn severity_picks_the_highest_priority_sink() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(severity_level(S::ERROR), log::Level::Error);
        assert_eq!(severity_level(S::WARNING), log::Level::Warn);
        assert_eq!(severity_level(S::INFO), log::Level::Info);
        assert_eq!(severity_level(S::VERBOSE), log::Level::Debug);
        assert_eq!(severity_level(S::WARNING | S::ERROR), log::Level::Error);
    }

    #[test]
    fn callback_never_aborts() {
        let message = CString::new("vkCreateDevice: something odd").unwrap();
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: message.as_ptr(),
            ..Default::default()
        };

        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);

        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }
}
