use thiserror::Error;

/// Errors surfaced by configuration, element selection and state restoration.
#[derive(Debug, Error)]
pub enum EfacError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A carousel was asked to select an element it doesn't hold.
    #[error("element index {index} out of range for carousel of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    /// A state struct was applied to the wrong kind of element.
    #[error("cannot apply {found} state to {expected}")]
    StateMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("state version {found} is not supported (expected {supported})")]
    UnsupportedStateVersion { found: u32, supported: u32 },
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
