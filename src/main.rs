// =============================================================================
// VULKAN BOOTSTRAP - window, instance, debug messenger, physical device
// =============================================================================
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (windowing collaborator)                      │
// │    └── VulkanContext (lifecycle manager)                        │
// │          ├── Capability query + requirement resolver            │
// │          ├── Instance (+ debug messenger when validating)       │
// │          └── Selected physical device                           │
// └─────────────────────────────────────────────────────────────────┘
//
// STARTUP FLOW:
// 1. Load config.toml, initialize logging
// 2. Create window
// 3. Ask the display which surface extensions it needs
// 4. Bootstrap Vulkan (fatal errors exit with code 1)
// 5. Idle in the event loop until the window is closed
// 6. Tear down: messenger -> instance -> window
//
// =============================================================================

mod backend;
mod config;
mod window;

use anyhow::Result;
use backend::{BootstrapError, VulkanContext, VulkanLoader};
use config::{Config, CONFIG_PATH};
use raw_window_handle::HasDisplayHandle;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Load configuration from config.toml
    let (config, outcome) = Config::load();

    // Initialize logging, then report how the config was loaded
    init_logging(&config);
    log::info!("Starting Vulkan bootstrap");
    outcome.report(CONFIG_PATH);
    log::debug!("Config: {:?}", config);
    log::info!(
        "Window: {}x{} ({})",
        config.window.width,
        config.window.height,
        config.window.title
    );
    log::info!(
        "Validation: {}",
        if config.validation_enabled() { "enabled" } else { "disabled" }
    );

    let event_loop = EventLoop::new()?;
    // Nothing is rendered; only wake up for window events
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    let fatal = app.fatal.take();
    drop(app);

    if let Some(err) = fatal {
        eprintln!("fatal ({:?}): {}", err.tier(), err);
        std::process::exit(err.exit_code());
    }

    Ok(())
}

/// Initialize logging; RUST_LOG overrides the configured level
fn init_logging(config: &Config) {
    use env_logger::Builder;

    let mut builder = Builder::new();
    builder.filter_level(config.log_level());
    builder.parse_default_env();
    builder.init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Owns the window and everything created against it.
///
/// IMPORTANT: the Vulkan context must be destroyed before the window.
struct App {
    config: Config,
    vulkan: Option<VulkanContext<VulkanLoader>>,
    window: Option<Window>,
    /// Set when bootstrap failed; main exits with a failure code
    fatal: Option<BootstrapError>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            vulkan: None,
            window: None,
            fatal: None,
        }
    }

    /// Bootstrap Vulkan against the window's display.
    fn init_vulkan(&mut self, window: &Window) -> Result<(), BootstrapError> {
        log::info!("Initializing Vulkan...");

        let display = window
            .display_handle()
            .map_err(|e| BootstrapError::UnsupportedDisplay(e.to_string()))?
            .as_raw();
        let window_extensions = crate::window::required_instance_extensions(display)?;
        log::debug!("Window requires {} extension(s)", window_extensions.len());
        for name in &window_extensions {
            log::debug!("   window extension: {}", name);
        }

        let instance_config = self.config.instance_config(&window_extensions);
        let selector = self.config.device_selector();
        log::debug!("Device selection: {:?}", selector.strategy());

        let loader = VulkanLoader::load()?;
        let context = VulkanContext::bootstrap(loader, &instance_config, &selector)?;

        for diagnostic in context.diagnostics() {
            log::debug!("bootstrap diagnostic ({:?}): {}", diagnostic.tier(), diagnostic);
        }
        log_summary(&context);

        self.vulkan = Some(context);
        log::info!("Vulkan initialized successfully!");
        Ok(())
    }
}

fn log_summary(context: &VulkanContext<VulkanLoader>) {
    let device = context.physical_device();
    log::info!("Bootstrap summary:");
    log::info!("   GPU: {} ({:?})", device.name, device.device_type);
    log::info!("   extensions: {}", context.enabled_extensions().join(", "));
    log::info!(
        "   layers: {}",
        if context.enabled_layers().is_empty() {
            "none".to_string()
        } else {
            context.enabled_layers().join(", ")
        }
    );
    log::info!(
        "   debug messenger: {}",
        if context.has_messenger() { "on" } else { "off" }
    );
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.fatal.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => w,
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                self.fatal = Some(BootstrapError::WindowCreation(e.to_string()));
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.init_vulkan(&window) {
            log::error!("Failed to initialize Vulkan: {}", e);
            self.fatal = Some(e);
            event_loop.exit();
            return;
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

// =============================================================================
// CLEANUP
// =============================================================================

impl Drop for App {
    fn drop(&mut self) {
        log::info!("Cleaning up...");

        // 1. Vulkan: messenger, then instance
        if let Some(vulkan) = self.vulkan.take() {
            if let Some(diagnostic) = vulkan.shutdown() {
                log::trace!("{}", diagnostic);
            }
        }

        // 2. Window
        self.window = None;

        log::info!("Cleanup complete");
    }
}
