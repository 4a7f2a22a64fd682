use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::num::NonZeroU32;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use democonfig::WindowConfig;
use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasRawWindowHandle;
use tracing::{debug, info, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use crate::types::InitError;

/// Entry points the demo cannot run without. A loader that fails to resolve
/// any of them is treated as a failed loader initialisation.
const REQUIRED_SYMBOLS: [(&str, fn() -> bool); 12] = [
    ("glGetString", gl::GetString::is_loaded),
    ("glViewport", gl::Viewport::is_loaded),
    ("glClear", gl::Clear::is_loaded),
    ("glCreateShader", gl::CreateShader::is_loaded),
    ("glCompileShader", gl::CompileShader::is_loaded),
    ("glCreateProgram", gl::CreateProgram::is_loaded),
    ("glLinkProgram", gl::LinkProgram::is_loaded),
    ("glValidateProgram", gl::ValidateProgram::is_loaded),
    ("glProgramUniform1f", gl::ProgramUniform1f::is_loaded),
    ("glProgramUniform2fv", gl::ProgramUniform2fv::is_loaded),
    ("glGenVertexArrays", gl::GenVertexArrays::is_loaded),
    ("glDrawArrays", gl::DrawArrays::is_loaded),
];

/// Identification strings reported by the driver once functions are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlInfo {
    pub version: String,
    pub renderer: String,
    pub shading_language: String,
}

/// The one window and its current OpenGL context.
///
/// Every GL object in the crate borrows this value, so all of them are released
/// while the context is still alive and current on this thread.
pub struct GlContext {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
    surface_size: Cell<PhysicalSize<u32>>,
}

impl GlContext {
    /// Opens the window and makes a core-profile context current on it.
    pub fn create(event_loop: &EventLoop<()>, config: &WindowConfig) -> Result<Self, InitError> {
        let (major, minor) = config.gl_version;
        let window_builder = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64))
            .with_resizable(config.resizable)
            .with_visible(true);

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));
        let (window, gl_config) =
            contain_picker_panic(|| display_builder.build(event_loop, template, pick_config))?
                .map_err(|err| InitError::Window(err.to_string()))?;
        let window =
            window.ok_or_else(|| InitError::Window("display builder returned no window".into()))?;
        debug!(
            samples = gl_config.num_samples(),
            alpha = gl_config.alpha_size(),
            "selected framebuffer config"
        );

        let raw_window_handle = window.raw_window_handle();
        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .build(Some(raw_window_handle));

        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .map_err(|source| InitError::Context {
                major,
                minor,
                source,
            })?;

        let size = window.inner_size();
        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            non_zero(size.width),
            non_zero(size.height),
        );
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(InitError::Surface)?;

        let context = not_current
            .make_current(&surface)
            .map_err(|source| InitError::Context {
                major,
                minor,
                source,
            })?;

        let interval = if config.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(err) = surface.set_swap_interval(&context, interval) {
            warn!(vsync = config.vsync, "failed to set swap interval: {err}");
        }

        info!(
            width = size.width,
            height = size.height,
            gl_major = major,
            gl_minor = minor,
            "window and OpenGL context created"
        );

        Ok(Self {
            surface,
            context,
            window,
            surface_size: Cell::new(size),
        })
    }

    /// Resolves GL entry points through the context's display.
    pub fn load_functions(&self) -> Result<GlInfo, InitError> {
        let display = self.context.display();
        gl::load_with(|symbol| match CString::new(symbol) {
            Ok(name) => display.get_proc_address(name.as_c_str()),
            Err(_) => ptr::null(),
        });

        if let Some(&(symbol, _)) = REQUIRED_SYMBOLS.iter().find(|(_, loaded)| !loaded()) {
            return Err(InitError::Loader { symbol });
        }

        let info = GlInfo {
            version: gl_string(gl::VERSION),
            renderer: gl_string(gl::RENDERER),
            shading_language: gl_string(gl::SHADING_LANGUAGE_VERSION),
        };
        info!(
            version = %info.version,
            renderer = %info.renderer,
            glsl = %info.shading_language,
            "OpenGL functions loaded"
        );
        Ok(info)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Current framebuffer size in physical pixels, queried fresh.
    pub fn framebuffer_size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    /// Matches the surface and GL viewport to `size`.
    pub fn resize_viewport(&self, size: PhysicalSize<u32>) {
        if size != self.surface_size.get() && size.width > 0 && size.height > 0 {
            self.surface
                .resize(&self.context, non_zero(size.width), non_zero(size.height));
            debug!(width = size.width, height = size.height, "surface resized");
            self.surface_size.set(size);
        }
        unsafe {
            gl::Viewport(0, 0, size.width as i32, size.height as i32);
        }
    }

    pub fn swap_buffers(&self) -> Result<(), glutin::error::Error> {
        self.surface.swap_buffers(&self.context)
    }
}

/// Picks the config with the fewest samples. The picker cannot fail, so an
/// empty candidate list panics and is turned into an error by
/// [`contain_picker_panic`].
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, candidate| {
            if candidate.num_samples() < best.num_samples() {
                candidate
            } else {
                best
            }
        })
        .expect("display offered no framebuffer configs")
}

fn contain_picker_panic<T>(build: impl FnOnce() -> T) -> Result<T, InitError> {
    panic::catch_unwind(AssertUnwindSafe(build)).map_err(|_| InitError::NoFramebufferConfig)
}

pub(crate) fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

fn gl_string(name: gl::types::GLenum) -> String {
    let raw = unsafe { gl::GetString(name) };
    if raw.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(raw.cast()) }
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_clamps_minimised_windows() {
        assert_eq!(non_zero(0).get(), 1);
        assert_eq!(non_zero(512).get(), 512);
    }

    #[test]
    fn empty_config_list_becomes_an_init_error() {
        let err = contain_picker_panic(|| -> u32 { panic!("no configs") }).unwrap_err();
        assert!(matches!(err, InitError::NoFramebufferConfig));
        assert_eq!(contain_picker_panic(|| 7).unwrap(), 7);
    }

    #[test]
    fn required_symbols_are_unique() {
        let mut names: Vec<&str> = REQUIRED_SYMBOLS.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REQUIRED_SYMBOLS.len());
    }
}
