use std::any::type_name;
use thiserror::Error;

/// Failures raised by [`Mediator`](crate::Mediator) itself, handler errors pass through as they are.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no handler registered for {request_type}")]
    Unhandled { request_type: &'static str },

    #[error("handler for {request_type} received a request of another type")]
    RequestMismatch { request_type: &'static str },

    #[error("handler for {request_type} produced an output of another type")]
    OutputMismatch { request_type: &'static str },

    #[error("dispatch of {request_type} was cancelled")]
    Cancelled { request_type: &'static str },
}

impl DispatchError {
    pub fn unhandled<R>() -> Self {
        Self::Unhandled { request_type: type_name::<R>() }
    }

    pub fn request_mismatch<R>() -> Self {
        Self::RequestMismatch { request_type: type_name::<R>() }
    }

    pub fn output_mismatch<R>() -> Self {
        Self::OutputMismatch { request_type: type_name::<R>() }
    }

    pub fn cancelled<R>() -> Self {
        Self::Cancelled { request_type: type_name::<R>() }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
