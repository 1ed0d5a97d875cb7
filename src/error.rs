use std::path::PathBuf;

/// Errors that can occur while importing a model.
///
/// Scene-level failures ([`ImportError::ImportFailed`], [`ImportError::Allocation`])
/// abort an import. The remaining variants are local to a single texture or mesh:
/// they are logged and the offending item is skipped.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to import scene '{0}': {1}")]
    ImportFailed(PathBuf, String),

    #[error("failed to allocate {1} {0}")]
    Allocation(&'static str, usize),

    #[error("failed to decode texture '{0}': {1}")]
    TextureDecode(PathBuf, String),

    #[error("unsupported channel count {1} in '{0}'")]
    UnsupportedFormat(PathBuf, u8),

    #[error("malformed path '{0}': no file extension")]
    MalformedPath(PathBuf),

    #[error("index {index} out of range for a mesh with {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
}

impl ImportError {
    /// Whether this error aborts the whole import rather than a single texture or mesh.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::ImportFailed(..) | ImportError::Allocation(..)
        )
    }
}
