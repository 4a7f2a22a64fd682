//! Shader compilation unit.
//!
//! Loads GLSL text from disk, compiles each stage, attaches the survivors to a
//! program, then links and validates it. None of these steps abort the demo:
//! failures are logged with the driver's diagnostic text and the program is used
//! anyway, whatever state it ended up in. Only failing to create the program
//! object itself is fatal.
//!
//! Stage and program objects are owned by guards that delete them on drop, on
//! every path. The guards borrow the [`GlContext`] so they cannot outlive it.

use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use gl::types::{GLchar, GLenum, GLint, GLsizei, GLuint};
use tracing::{debug, info, warn};

use crate::context::GlContext;
use crate::types::InitError;

/// Pipeline stage a piece of GLSL is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Geometry,
    Vertex,
    Fragment,
}

impl StageKind {
    pub fn gl_enum(self) -> GLenum {
        match self {
            StageKind::Geometry => gl::GEOMETRY_SHADER,
            StageKind::Vertex => gl::VERTEX_SHADER,
            StageKind::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Geometry => f.write_str("geometry"),
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Reads a shader file, one `\n`-terminated line at a time.
///
/// A file that cannot be read yields an empty string; the stage then fails to
/// compile instead of the load failing here.
pub fn load_source(path: &Path) -> String {
    info!(path = %path.display(), "loading shader source");
    match fs::read_to_string(path) {
        Ok(contents) => normalise_lines(&contents),
        Err(err) => {
            warn!(path = %path.display(), "failed to read shader source: {err}");
            String::new()
        }
    }
}

fn normalise_lines(contents: &str) -> String {
    let mut data = String::with_capacity(contents.len() + 1);
    for line in contents.lines() {
        data.push_str(line);
        data.push('\n');
    }
    data
}

/// Source text for the three stages of the demo program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSources {
    pub geometry: String,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn load(geometry: &Path, vertex: &Path, fragment: &Path) -> Self {
        Self {
            geometry: load_source(geometry),
            vertex: load_source(vertex),
            fragment: load_source(fragment),
        }
    }

    /// Stages in attach order.
    pub fn stages(&self) -> [(StageKind, &str); 3] {
        [
            (StageKind::Geometry, self.geometry.as_str()),
            (StageKind::Vertex, self.vertex.as_str()),
            (StageKind::Fragment, self.fragment.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    /// The driver refused to allocate a stage object.
    CreateFailed,
    CompileFailed { log: String },
}

/// Result of a link or validate status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed { log: String },
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, CheckOutcome::Passed)
    }
}

/// What happened while building the demo program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub attached: Vec<StageKind>,
    pub rejected: Vec<StageKind>,
    pub link: CheckOutcome,
    pub validate: CheckOutcome,
}

impl BuildReport {
    pub fn is_usable(&self) -> bool {
        self.rejected.is_empty() && self.link.passed()
    }
}

struct ShaderStage<'gl> {
    id: GLuint,
    kind: StageKind,
    _gl: PhantomData<&'gl GlContext>,
}

impl<'gl> ShaderStage<'gl> {
    fn create(_gl: &'gl GlContext, kind: StageKind) -> Option<Self> {
        let id = unsafe { gl::CreateShader(kind.gl_enum()) };
        (id != 0).then_some(Self {
            id,
            kind,
            _gl: PhantomData,
        })
    }

    fn compile(&self, source: &str) -> bool {
        let pointer = source.as_ptr().cast::<GLchar>();
        let length = source.len() as GLint;
        let mut status: GLint = 0;
        unsafe {
            gl::ShaderSource(self.id, 1, &pointer, &length);
            gl::CompileShader(self.id);
            gl::GetShaderiv(self.id, gl::COMPILE_STATUS, &mut status);
        }
        status != 0
    }

    fn log(&self) -> String {
        let mut length: GLint = 0;
        unsafe { gl::GetShaderiv(self.id, gl::INFO_LOG_LENGTH, &mut length) };
        if length <= 0 {
            return String::new();
        }
        let mut buffer = vec![0u8; length as usize];
        let mut written: GLsizei = 0;
        unsafe {
            gl::GetShaderInfoLog(self.id, length, &mut written, buffer.as_mut_ptr().cast());
        }
        info_log_to_string(buffer, written)
    }
}

impl Drop for ShaderStage<'_> {
    fn drop(&mut self) {
        // Attached stages are only flagged here; the driver frees them with
        // the program.
        unsafe { gl::DeleteShader(self.id) };
        debug!(shader = self.id, stage = %self.kind, "shader stage released");
    }
}

/// A GL program object and the stages attached to it.
pub struct ShaderProgram<'gl> {
    id: GLuint,
    attached: Vec<StageKind>,
    gl: &'gl GlContext,
}

impl<'gl> ShaderProgram<'gl> {
    pub fn create(gl: &'gl GlContext) -> Result<Self, InitError> {
        let id = unsafe { gl::CreateProgram() };
        if id == 0 {
            return Err(InitError::Program);
        }
        debug!(program = id, "shader program created");
        Ok(Self {
            id,
            attached: Vec::new(),
            gl,
        })
    }

    /// Creates the program and runs attach (geometry, vertex, fragment), link
    /// and validate.
    pub fn build(
        gl: &'gl GlContext,
        sources: &ShaderSources,
    ) -> Result<(Self, BuildReport), InitError> {
        let mut program = Self::create(gl)?;
        let mut rejected = Vec::new();
        for (kind, source) in sources.stages() {
            if program.attach(source, kind) != AttachOutcome::Attached {
                rejected.push(kind);
            }
        }
        let link = program.link();
        let validate = program.validate();
        let report = BuildReport {
            attached: program.attached().to_vec(),
            rejected,
            link,
            validate,
        };
        if report.is_usable() {
            info!(program = program.id, "shader program ready");
        } else {
            warn!(
                program = program.id,
                rejected = ?report.rejected,
                linked = report.link.passed(),
                "shader program built with errors; rendering anyway"
            );
        }
        Ok((program, report))
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn attached(&self) -> &[StageKind] {
        &self.attached
    }

    /// Compiles `source` as `kind` and attaches it when compilation succeeds.
    pub fn attach(&mut self, source: &str, kind: StageKind) -> AttachOutcome {
        info!(program = self.id, stage = %kind, bytes = source.len(), "compiling shader stage");
        let Some(stage) = ShaderStage::create(self.gl, kind) else {
            warn!(program = self.id, stage = %kind, "failed to create shader stage object");
            return AttachOutcome::CreateFailed;
        };

        if !stage.compile(source) {
            let log = stage.log();
            warn!(
                program = self.id,
                shader = stage.id,
                stage = %kind,
                "shader stage failed to compile:\n{log}"
            );
            return AttachOutcome::CompileFailed { log };
        }

        unsafe { gl::AttachShader(self.id, stage.id) };
        self.attached.push(kind);
        AttachOutcome::Attached
    }

    pub fn link(&self) -> CheckOutcome {
        info!(program = self.id, stages = ?self.attached, "linking shader program");
        unsafe { gl::LinkProgram(self.id) };
        self.check_status(gl::LINK_STATUS, "link")
    }

    /// Asks the driver whether the program can run against the current state.
    pub fn validate(&self) -> CheckOutcome {
        info!(program = self.id, "validating shader program");
        unsafe { gl::ValidateProgram(self.id) };
        self.check_status(gl::VALIDATE_STATUS, "validate")
    }

    pub fn bind(&self) {
        unsafe { gl::UseProgram(self.id) };
    }

    /// The program's info log, empty when the driver has nothing to say.
    pub fn log(&self) -> String {
        let mut length: GLint = 0;
        unsafe { gl::GetProgramiv(self.id, gl::INFO_LOG_LENGTH, &mut length) };
        if length <= 0 {
            return String::new();
        }
        let mut buffer = vec![0u8; length as usize];
        let mut written: GLsizei = 0;
        unsafe {
            gl::GetProgramInfoLog(self.id, length, &mut written, buffer.as_mut_ptr().cast());
        }
        info_log_to_string(buffer, written)
    }

    fn check_status(&self, parameter: GLenum, step: &str) -> CheckOutcome {
        let mut status: GLint = 0;
        unsafe { gl::GetProgramiv(self.id, parameter, &mut status) };
        if status != 0 {
            return CheckOutcome::Passed;
        }
        let log = self.log();
        warn!(program = self.id, "shader program failed to {step}:\n{log}");
        CheckOutcome::Failed { log }
    }
}

impl Drop for ShaderProgram<'_> {
    fn drop(&mut self) {
        unsafe {
            gl::UseProgram(0);
            gl::DeleteProgram(self.id);
        }
        debug!(program = self.id, "shader program released");
    }
}

/// Converts a driver info-log buffer into text, keeping only the `written`
/// bytes and dropping the terminator.
fn info_log_to_string(mut buffer: Vec<u8>, written: GLsizei) -> String {
    let written = usize::try_from(written).unwrap_or(0).min(buffer.len());
    buffer.truncate(written);
    while buffer.last() == Some(&0) {
        buffer.pop();
    }
    String::from_utf8_lossy(&buffer).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stage_kinds_map_to_gl_enums() {
        assert_eq!(StageKind::Geometry.gl_enum(), gl::GEOMETRY_SHADER);
        assert_eq!(StageKind::Vertex.gl_enum(), gl::VERTEX_SHADER);
        assert_eq!(StageKind::Fragment.gl_enum(), gl::FRAGMENT_SHADER);
        assert_eq!(StageKind::Geometry.to_string(), "geometry");
    }

    #[test]
    fn missing_source_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_source(&dir.path().join("f.missing.glsl")), "");
    }

    #[test]
    fn load_terminates_every_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.glsl");
        fs::write(&path, "#version 450 core\r\nvoid main() {}").unwrap();
        assert_eq!(load_source(&path), "#version 450 core\nvoid main() {}\n");
    }

    #[test]
    fn sources_attach_in_pipeline_order() {
        let sources = ShaderSources {
            geometry: "g".into(),
            vertex: "v".into(),
            fragment: "f".into(),
        };
        let order: Vec<_> = sources.stages().iter().map(|(kind, src)| (*kind, *src)).collect();
        assert_eq!(
            order,
            vec![
                (StageKind::Geometry, "g"),
                (StageKind::Vertex, "v"),
                (StageKind::Fragment, "f"),
            ]
        );
    }

    #[test]
    fn info_log_drops_terminator_and_unwritten_bytes() {
        let mut buffer = b"0:12(3): error: syntax error\n\0".to_vec();
        buffer.extend_from_slice(&[0xAA; 4]);
        let written = (buffer.len() - 4) as GLsizei;
        assert_eq!(
            info_log_to_string(buffer, written),
            "0:12(3): error: syntax error"
        );
    }

    #[test]
    fn info_log_tolerates_bogus_lengths() {
        assert_eq!(info_log_to_string(b"abc\0".to_vec(), -5), "");
        assert_eq!(info_log_to_string(b"abc\0".to_vec(), 99), "abc");
        assert_eq!(info_log_to_string(vec![0xff, b'x'], 2), "\u{fffd}x");
    }

    #[test]
    fn report_usability_requires_all_stages_and_link() {
        let report = BuildReport {
            attached: vec![StageKind::Geometry, StageKind::Vertex],
            rejected: vec![StageKind::Fragment],
            link: CheckOutcome::Passed,
            validate: CheckOutcome::Passed,
        };
        assert!(!report.is_usable());
        let report = BuildReport {
            rejected: Vec::new(),
            ..report
        };
        assert!(report.is_usable());
    }
}
