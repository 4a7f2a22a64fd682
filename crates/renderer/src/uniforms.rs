use std::ffi::CString;

use gl::types::GLint;

use crate::shader::ShaderProgram;

/// Viewport resolution uniform, a `vec2` in pixels.
pub const RESOLUTION_UNIFORM: &str = "iResolution";
/// Simulated time uniform, a `float` in seconds.
pub const TIME_UNIFORM: &str = "iTime";

/// Location of a uniform inside one program. `-1` means "not present".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation(GLint);

impl UniformLocation {
    pub const INVALID: Self = Self(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    pub fn raw(self) -> GLint {
        self.0
    }
}

/// Looks up `name` in `program`.
///
/// Names the compiler optimised away, misspelled names and names that cannot
/// be passed to the driver all resolve to [`UniformLocation::INVALID`].
pub fn locate(program: &ShaderProgram<'_>, name: &str) -> UniformLocation {
    let Ok(c_name) = CString::new(name) else {
        return UniformLocation::INVALID;
    };
    UniformLocation(unsafe { gl::GetUniformLocation(program.id(), c_name.as_ptr()) })
}

/// Writes a `float` uniform straight into `program`, bound or not.
pub fn set_float(program: &ShaderProgram<'_>, name: &str, value: f32) {
    let location = locate(program, name);
    if location.is_valid() {
        unsafe { gl::ProgramUniform1f(program.id(), location.raw(), value) };
    }
}

/// Writes a `vec2` uniform straight into `program`, bound or not.
pub fn set_vec2(program: &ShaderProgram<'_>, name: &str, value: [f32; 2]) {
    let location = locate(program, name);
    if location.is_valid() {
        unsafe { gl::ProgramUniform2fv(program.id(), location.raw(), 1, value.as_ptr()) };
    }
}

/// Per-frame values the demo shaders read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
}

impl FrameUniforms {
    pub fn new(width: u32, height: u32, time: f32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            time,
        }
    }

    pub fn upload(&self, program: &ShaderProgram<'_>) {
        set_vec2(program, RESOLUTION_UNIFORM, self.resolution);
        set_float(program, TIME_UNIFORM, self.time);
    }
}
