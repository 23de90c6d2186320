use crate::error::BoxError;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a composed pipeline yields: `Ok(None)` when it was built without an action.
pub type PipelineResult<Resp> = Result<Option<Resp>, BoxError>;

type CallFn<Req, Resp> = dyn Fn(Req) -> BoxFuture<'static, PipelineResult<Resp>> + Send + Sync;
type UnitCallFn<Resp> = dyn Fn() -> BoxFuture<'static, PipelineResult<Resp>> + Send + Sync;

/// A composed `Req -> Resp` function.
///
/// Cloning is cheap and every clone shares the same stages, the pipeline itself carries no state
/// between calls so it can be invoked from many tasks at once.
pub struct Pipeline<Req, Resp> {
    call: Option<Arc<CallFn<Req, Resp>>>,
}

impl<Req, Resp> Pipeline<Req, Resp>
where
    Req: 'static,
    Resp: Send + 'static,
{
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Resp>> + Send + 'static,
    {
        let call: Arc<CallFn<Req, Resp>> = Arc::new(move |request: Req| f(request).boxed());
        Self { call: Some(call) }
    }

    /// A pipeline that answers every request with `Ok(None)`
    pub fn noop() -> Self {
        Self { call: None }
    }

    #[inline]
    pub fn is_noop(&self) -> bool {
        self.call.is_none()
    }

    /// Run the pipeline for one request
    ///
    /// The returned future owns everything it needs, so it can be spawned.
    pub fn call(&self, request: Req) -> BoxFuture<'static, PipelineResult<Resp>> {
        match &self.call {
            Some(call) => call(request),
            None => future::ready(Ok(None)).boxed(),
        }
    }

    /// Turn the pipeline into a plain function, for hosts that only accept closures
    pub fn into_fn(self) -> impl Fn(Req) -> BoxFuture<'static, PipelineResult<Resp>> + Clone + Send + Sync + 'static {
        move |request| self.call(request)
    }
}

impl<Req, Resp> Clone for Pipeline<Req, Resp> {
    fn clone(&self) -> Self {
        Self { call: self.call.clone() }
    }
}

impl<Req, Resp> fmt::Debug for Pipeline<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request", &type_name::<Req>())
            .field("response", &type_name::<Resp>())
            .field("noop", &self.call.is_none())
            .finish()
    }
}

/// A composed parameterless `() -> Resp` function.
pub struct UnitPipeline<Resp> {
    call: Option<Arc<UnitCallFn<Resp>>>,
}

impl<Resp> UnitPipeline<Resp>
where
    Resp: Send + 'static,
{
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Resp>> + Send + 'static,
    {
        let call: Arc<UnitCallFn<Resp>> = Arc::new(move || f().boxed());
        Self { call: Some(call) }
    }

    pub fn noop() -> Self {
        Self { call: None }
    }

    #[inline]
    pub fn is_noop(&self) -> bool {
        self.call.is_none()
    }

    pub fn call(&self) -> BoxFuture<'static, PipelineResult<Resp>> {
        match &self.call {
            Some(call) => call(),
            None => future::ready(Ok(None)).boxed(),
        }
    }

    pub fn into_fn(self) -> impl Fn() -> BoxFuture<'static, PipelineResult<Resp>> + Clone + Send + Sync + 'static {
        move || self.call()
    }
}

impl<Resp> Clone for UnitPipeline<Resp> {
    fn clone(&self) -> Self {
        Self { call: self.call.clone() }
    }
}

impl<Resp> fmt::Debug for UnitPipeline<Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitPipeline")
            .field("response", &type_name::<Resp>())
            .field("noop", &self.call.is_none())
            .finish()
    }
}
