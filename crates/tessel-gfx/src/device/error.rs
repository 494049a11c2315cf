use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised by graphics devices and the resources built on them.
#[derive(Debug)]
pub enum GfxError {
    /// The device refused to create or update an object.
    Device(String),
    /// A resource was used before `reset` allocated its device object.
    NotAllocated(&'static str),
    /// A handle that the device does not know (already destroyed or foreign).
    UnknownHandle(u64),
    /// Reading shader source from disk failed.
    ShaderIo { path: PathBuf, source: io::Error },
    /// WGSL parsing, validation, or entry-point lookup failed.
    ShaderCompile { label: String, message: String },
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::Device(msg) => write!(f, "device error: {msg}"),
            GfxError::NotAllocated(what) => write!(f, "{what} used before it was allocated"),
            GfxError::UnknownHandle(id) => write!(f, "unknown device handle #{id}"),
            GfxError::ShaderIo { path, source } => {
                write!(f, "failed to read shader `{}`: {source}", path.display())
            }
            GfxError::ShaderCompile { label, message } => {
                write!(f, "failed to compile shader `{label}`:\n{message}")
            }
        }
    }
}

impl std::error::Error for GfxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GfxError::ShaderIo { source, .. } => Some(source),
            _ => None,
        }
    }
}
