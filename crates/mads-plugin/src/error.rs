//! Plugin host error kinds, folded into the shared MADS error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginHostError {
    #[error("no plugin artifact found for \"{0}\"")]
    ArtifactNotFound(String),

    #[error("failed to load plugin library: {0}")]
    Load(#[from] libloading::Error),

    #[error("plugin entry symbol returned a null pointer")]
    NullEntry,

    #[error("malformed return code: {0}")]
    BadReturnCode(i32),

    #[error("malformed parameter override \"{0}\"")]
    BadParam(String),
}

impl From<PluginHostError> for mads_core::MadsError {
    fn from(e: PluginHostError) -> Self {
        mads_core::MadsError::Plugin(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PluginHostError>;
