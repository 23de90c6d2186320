//! A [`Dispatcher`] that routes each request to the handler registered for its type.

use crate::dispatcher::{DispatchRequest, Dispatcher};
use crate::error::DispatchError;
use async_trait::async_trait;
use data_contract::BoxError;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

type ErasedOutput = Result<Box<dyn Any + Send>, BoxError>;
type ErasedHandler = Box<dyn Fn(Box<dyn Any + Send>, CancellationToken) -> BoxFuture<'static, ErasedOutput> + Send + Sync>;

/// Type keyed request dispatch.
///
/// One handler per request type. A handler gets the request by value along with the dispatch's
/// cancellation token, and the mediator stops waiting for it as soon as that token is cancelled.
pub struct Mediator {
    handlers: HashMap<TypeId, ErasedHandler>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// Returns true if a handler for `R` is registered
    pub fn handles<R: DispatchRequest>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }
}

#[async_trait]
impl Dispatcher for Mediator {
    async fn send<R: DispatchRequest>(&self, request: R, cancel: CancellationToken) -> Result<R::Output, BoxError> {
        let handler = self.handlers.get(&TypeId::of::<R>()).ok_or_else(DispatchError::unhandled::<R>)?;

        trace!(request = type_name::<R>(), "dispatching");
        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DispatchError::cancelled::<R>().into()),
            output = handler(Box::new(request) as Box<dyn Any + Send>, cancel.clone()) => output?,
        };

        match output.downcast::<R::Output>() {
            Ok(output) => Ok(*output),
            Err(_output) => Err(DispatchError::output_mismatch::<R>().into()),
        }
    }
}

impl fmt::Debug for Mediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator").field("handlers", &self.handlers.len()).finish()
    }
}

pub struct MediatorBuilder {
    handlers: HashMap<TypeId, ErasedHandler>,
}

impl MediatorBuilder {
    fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Register the handler for requests of type `R`, replacing any previous one
    pub fn handler<R, F, Fut>(mut self, f: F) -> Self
    where
        R: DispatchRequest,
        F: Fn(R, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R::Output, BoxError>> + Send + 'static,
    {
        let handler: ErasedHandler = Box::new(move |request: Box<dyn Any + Send>, cancel: CancellationToken| {
            match request.downcast::<R>() {
                Ok(request) => f(*request, cancel)
                    .map(|output| output.map(|output| Box::new(output) as Box<dyn Any + Send>))
                    .boxed(),
                Err(_request) => {
                    let mismatch: ErasedOutput = Err(DispatchError::request_mismatch::<R>().into());
                    future::ready(mismatch).boxed()
                }
            }
        });

        if self.handlers.insert(TypeId::of::<R>(), handler).is_some() {
            warn!(request = type_name::<R>(), "handler registered twice, keeping the last one");
        }
        self
    }

    pub fn build(self) -> Mediator {
        Mediator { handlers: self.handlers }
    }
}

impl fmt::Debug for MediatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatorBuilder").field("handlers", &self.handlers.len()).finish()
    }
}
