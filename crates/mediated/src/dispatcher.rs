//! The dispatch capability a mediated contract uses as its action.

use async_trait::async_trait;
use data_contract::BoxError;
use tokio_util::sync::CancellationToken;

/// A request that can be sent through a [`Dispatcher`].
///
/// The request type fixes what its handler answers with.
pub trait DispatchRequest: Send + 'static {
    type Output: Send + 'static;
}

/// Sends a typed request to whatever handles it and waits for the typed result.
///
/// Implementations are shared by every invocation of every pipeline built over them, so they
/// must be safe to call concurrently. `cancel` is signalled when the caller gives up on the
/// request, implementations are expected to stop early and fail once it is cancelled.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send<R: DispatchRequest>(&self, request: R, cancel: CancellationToken) -> Result<R::Output, BoxError>;
}
