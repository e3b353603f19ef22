// Windowing collaborator - surface extensions per display platform

use ash::extensions::{ext, khr};
use raw_window_handle::RawDisplayHandle;

use crate::backend::BootstrapError;

/// Instance extensions the windowing layer needs to create a surface on
/// this display, `VK_KHR_surface` first.
pub fn required_instance_extensions(display: RawDisplayHandle) -> Result<Vec<String>, BootstrapError> {
    let platform = match display {
        RawDisplayHandle::Windows(_) => khr::Win32Surface::name(),
        RawDisplayHandle::Wayland(_) => khr::WaylandSurface::name(),
        RawDisplayHandle::Xlib(_) => khr::XlibSurface::name(),
        RawDisplayHandle::Xcb(_) => khr::XcbSurface::name(),
        RawDisplayHandle::Android(_) => khr::AndroidSurface::name(),
        RawDisplayHandle::AppKit(_) | RawDisplayHandle::UiKit(_) => ext::MetalSurface::name(),
        other => return Err(BootstrapError::UnsupportedDisplay(format!("{:?}", other))),
    };

    Ok([khr::Surface::name(), platform]
        .iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}
