use thiserror::Error;

/// Failures surfaced to callers.
///
/// Transient states (a key that no longer resolves, an element that cannot be
/// linked yet) are not errors; they are skipped and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("Splice out of range: index {index} with {added} added element(s) in a list of {len}")]
    SpliceOutOfRange { index: usize, added: usize, len: usize },
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("No callback registered under the name '{0}'")]
    UnresolvedCallback(String),
    #[error("Named callback '{0}' needs a resolver, none configured")]
    NoResolver(String),
    #[error("View index {0} has no source counterpart")]
    Unlinked(usize),
    #[error("The view has no source list")]
    NoSource,
}

pub type Result<T> = std::result::Result<T, ViewError>;
