//! Error types shared by the renderer core and the browser glue.

use thiserror::Error;

/// Failures reported by a [`crate::gpu::Gpu`] backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GpuError {
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: &'static str, log: String },
    #[error("program failed to link: {0}")]
    ProgramLink(String),
    #[error("could not allocate {0}")]
    Resource(&'static str),
    #[error("framebuffer incomplete (status 0x{0:04x})")]
    IncompleteFramebuffer(u32),
    #[error("handle does not refer to a live resource")]
    UnknownHandle,
}

/// Rejections raised while loading theme configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("theme `{theme}`: viscosity {value} must lie in [0, 1)")]
    InvalidViscosity { theme: String, value: f32 },
    #[error("theme `{theme}`: {field} must be positive")]
    NonPositive { theme: String, field: &'static str },
    #[error("theme `{theme}`: {field} must not be negative")]
    Negative { theme: String, field: &'static str },
    #[error("theme `{theme}`: {field} must be a finite number")]
    NonFinite { theme: String, field: &'static str },
    #[error("unparseable color `{0}`")]
    BadColor(String),
    #[error("unknown theme id `{0}`")]
    UnknownTheme(String),
    #[error("engine option {field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },
}
