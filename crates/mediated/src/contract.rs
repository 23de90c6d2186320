//! Contracts whose action is a dispatch through a [`Dispatcher`].
//!
//! The caller only supplies prep and convert. The domain input is the dispatch request, and the
//! request type's declared output is the domain output.

use crate::dispatcher::{DispatchRequest, Dispatcher};
use crate::scope::CancelScope;
use data_contract::{Action, Contract, Convert, DirectConvert, Mapper, Pipeline, Prep, UnitContract, UnitPipeline, UnitPrep};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builds `Req -> Resp` pipelines whose action sends the domain input through a dispatcher.
pub struct MediatedContract<Req, Resp, M, D> {
    contract: Contract<Req, Resp, M>,
    dispatcher: Arc<D>,
    parent: Option<CancellationToken>,
}

impl<Req, Resp, M, D> MediatedContract<Req, Resp, M, D>
where
    M: Mapper,
    D: Dispatcher,
{
    pub fn new(mapper: Arc<M>, dispatcher: Arc<D>) -> Self {
        Self { contract: Contract::new(mapper), dispatcher, parent: None }
    }

    /// Open every dispatch scope under `parent`, cancelling it aborts the dispatches in flight
    #[must_use]
    pub fn with_cancellation(self, parent: CancellationToken) -> Self {
        Self { parent: Some(parent), ..self }
    }

    /// The plain contract, for pipelines with a hand written action
    pub fn contract(&self) -> &Contract<Req, Resp, M> {
        &self.contract
    }

    pub fn dispatcher(&self) -> &Arc<D> {
        &self.dispatcher
    }
}

impl<Req, Resp, M, D> MediatedContract<Req, Resp, M, D>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    M: Mapper + 'static,
    D: Dispatcher + 'static,
{
    /// Map the request into `In`, dispatch it, and map its output into the response
    pub fn mediate<In>(&self, prep: Prep<Req, In>, convert: Convert<Req, In::Output, Resp>) -> Pipeline<Req, Resp>
    where
        In: DispatchRequest,
    {
        self.contract
            .wrap::<In, In::Output>()
            .prep(prep)
            .action(dispatch(&self.dispatcher, self.parent.as_ref()))
            .convert(convert)
            .build()
    }

    /// Map the request into `In` and dispatch it, the dispatch output is the response
    pub fn mediate_direct<In>(&self, prep: Prep<Req, In>, convert: DirectConvert<Req, Resp>) -> Pipeline<Req, Resp>
    where
        In: DispatchRequest<Output = Resp>,
    {
        self.contract
            .wrap_direct::<In>()
            .prep(prep)
            .action(dispatch(&self.dispatcher, self.parent.as_ref()))
            .direct(convert)
            .build()
    }
}

impl<Req, Resp, M, D> Clone for MediatedContract<Req, Resp, M, D> {
    fn clone(&self) -> Self {
        Self { contract: self.contract.clone(), dispatcher: Arc::clone(&self.dispatcher), parent: self.parent.clone() }
    }
}

impl<Req, Resp, M, D> fmt::Debug for MediatedContract<Req, Resp, M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatedContract")
            .field("contract", &self.contract)
            .field("dispatcher", &type_name::<D>())
            .field("parent", &self.parent)
            .finish()
    }
}

/// Builds parameterless `() -> Resp` pipelines that dispatch a default built request.
pub struct UnitMediatedContract<Resp, M, D> {
    contract: UnitContract<Resp, M>,
    dispatcher: Arc<D>,
    parent: Option<CancellationToken>,
}

impl<Resp, M, D> UnitMediatedContract<Resp, M, D>
where
    M: Mapper,
    D: Dispatcher,
{
    pub fn new(mapper: Arc<M>, dispatcher: Arc<D>) -> Self {
        Self { contract: UnitContract::new(mapper), dispatcher, parent: None }
    }

    #[must_use]
    pub fn with_cancellation(self, parent: CancellationToken) -> Self {
        Self { parent: Some(parent), ..self }
    }

    pub fn contract(&self) -> &UnitContract<Resp, M> {
        &self.contract
    }

    pub fn dispatcher(&self) -> &Arc<D> {
        &self.dispatcher
    }
}

impl<Resp, M, D> UnitMediatedContract<Resp, M, D>
where
    Resp: Send + 'static,
    M: Mapper + 'static,
    D: Dispatcher + 'static,
{
    pub fn mediate<In>(&self, prep: UnitPrep<In>, convert: Convert<In, In::Output, Resp>) -> UnitPipeline<Resp>
    where
        In: DispatchRequest + Default + Clone,
    {
        self.contract
            .wrap::<In, In::Output>()
            .prep(prep)
            .action(dispatch(&self.dispatcher, self.parent.as_ref()))
            .convert(convert)
            .build()
    }

    pub fn mediate_direct<In>(&self, prep: UnitPrep<In>, convert: DirectConvert<In, Resp>) -> UnitPipeline<Resp>
    where
        In: DispatchRequest<Output = Resp> + Default + Clone,
    {
        self.contract
            .wrap_direct::<In>()
            .prep(prep)
            .action(dispatch(&self.dispatcher, self.parent.as_ref()))
            .direct(convert)
            .build()
    }
}

impl<Resp, M, D> Clone for UnitMediatedContract<Resp, M, D> {
    fn clone(&self) -> Self {
        Self { contract: self.contract.clone(), dispatcher: Arc::clone(&self.dispatcher), parent: self.parent.clone() }
    }
}

impl<Resp, M, D> fmt::Debug for UnitMediatedContract<Resp, M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitMediatedContract")
            .field("contract", &self.contract)
            .field("dispatcher", &type_name::<D>())
            .field("parent", &self.parent)
            .finish()
    }
}

/// The action of a mediated pipeline: one dispatch guarded by its own [`CancelScope`].
///
/// The scope is opened right before `send` and released as soon as the dispatch settles, or
/// when the invocation is dropped halfway.
fn dispatch<In, D>(dispatcher: &Arc<D>, parent: Option<&CancellationToken>) -> Action<In, In::Output>
where
    In: DispatchRequest,
    D: Dispatcher + 'static,
{
    let dispatcher = Arc::clone(dispatcher);
    let parent = parent.cloned();

    Action::async_fn(move |input: In| {
        let dispatcher = Arc::clone(&dispatcher);
        let parent = parent.clone();
        async move {
            let scope = CancelScope::open(parent.as_ref());
            let result = dispatcher.send(input, scope.token()).await;
            drop(scope);
            result
        }
    })
}
