use std::any::type_name;
use std::error::Error;
use thiserror::Error;

/// The error every pipeline stage reports through.
///
/// Stage errors are boxed once and otherwise passed through untouched, callers can recover the
/// concrete type with [`downcast_ref`](std::error::Error).
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Result of a single pipeline stage.
pub type StageResult<T> = Result<T, BoxError>;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("no mapping registered from {source_type} to {target_type}")]
    Unmapped { source_type: &'static str, target_type: &'static str },

    #[error("mapping from {source_type} to {target_type} failed: {cause}")]
    Failed {
        source_type: &'static str,
        target_type: &'static str,
        #[source]
        cause: BoxError,
    },

    #[error("mapping from {source_type} to {target_type} was registered for another type")]
    TypeMismatch { source_type: &'static str, target_type: &'static str },
}

impl MapError {
    pub fn unmapped<S, T>() -> Self {
        Self::Unmapped { source_type: type_name::<S>(), target_type: type_name::<T>() }
    }

    pub fn failed<S, T, E: Into<BoxError>>(cause: E) -> Self {
        Self::Failed { source_type: type_name::<S>(), target_type: type_name::<T>(), cause: cause.into() }
    }

    pub fn type_mismatch<S, T>() -> Self {
        Self::TypeMismatch { source_type: type_name::<S>(), target_type: type_name::<T>() }
    }
}
