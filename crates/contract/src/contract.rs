//! Contracts bind a [`Mapper`] and build composed pipelines out of stage descriptors.
//!
//! A [`Contract`] produces `Req -> Resp` pipelines, a [`UnitContract`] produces parameterless
//! `() -> Resp` pipelines whose domain input is built with `Default`. Both go through the same
//! [`Wrap`] builder:
//!
//! 1. ingress: the request is mapped (or derived) into the domain input
//! 2. prep: optionally rewrites request and input
//! 3. action: turns the input into the domain output
//! 4. the output is mapped into the response, or used as is in the direct variant
//! 5. convert: optionally rewrites the response, with the request and output at hand
//!
//! Every step is awaited before the next one starts, and the first error ends the invocation.

use crate::error::StageResult;
use crate::mapper::Mapper;
use crate::pipeline::{Pipeline, PipelineResult, UnitPipeline};
use crate::stage::{Action, AsyncActionFn, Convert, DirectConvert, Ingress, Prep, UnitPrep};
use std::any::type_name;
use std::convert::identity;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{Instrument, debug, debug_span, trace, warn};

/// Builds `Req -> Resp` pipelines over a shared [`Mapper`].
pub struct Contract<Req, Resp, M> {
    mapper: Arc<M>,
    _phantom: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp, M> Contract<Req, Resp, M>
where
    M: Mapper,
{
    pub fn new(mapper: Arc<M>) -> Self {
        Self { mapper, _phantom: PhantomData }
    }

    pub fn mapper(&self) -> &Arc<M> {
        &self.mapper
    }
}

impl<Req, Resp, M> Contract<Req, Resp, M>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    M: Mapper + 'static,
{
    /// Start a pipeline whose action yields `Out`, which the mapper then turns into `Resp`
    pub fn wrap<In, Out>(&self) -> Wrap<Req, In, Out, Resp, M>
    where
        In: Send + 'static,
        Out: Send + 'static,
    {
        Wrap::new(Arc::clone(&self.mapper))
    }

    /// Start a pipeline whose action already yields `Resp`, the response is never mapped
    pub fn wrap_direct<In>(&self) -> Wrap<Req, In, Resp, Resp, M>
    where
        In: Send + 'static,
    {
        self.wrap().direct(DirectConvert::Skip)
    }
}

impl<Req, Resp, M> Clone for Contract<Req, Resp, M> {
    fn clone(&self) -> Self {
        Self { mapper: Arc::clone(&self.mapper), _phantom: PhantomData }
    }
}

impl<Req, Resp, M> fmt::Debug for Contract<Req, Resp, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("request", &type_name::<Req>())
            .field("response", &type_name::<Resp>())
            .field("mapper", &type_name::<M>())
            .finish()
    }
}

/// Builds parameterless `() -> Resp` pipelines over a shared [`Mapper`].
///
/// Each call starts from `In::default()`. The (possibly prepared) input also takes the request's
/// place in [`Convert`], which is why `In` has to be `Clone`.
pub struct UnitContract<Resp, M> {
    mapper: Arc<M>,
    _phantom: PhantomData<fn() -> Resp>,
}

impl<Resp, M> UnitContract<Resp, M>
where
    M: Mapper,
{
    pub fn new(mapper: Arc<M>) -> Self {
        Self { mapper, _phantom: PhantomData }
    }

    pub fn mapper(&self) -> &Arc<M> {
        &self.mapper
    }
}

impl<Resp, M> UnitContract<Resp, M>
where
    Resp: Send + 'static,
    M: Mapper + 'static,
{
    pub fn wrap<In, Out>(&self) -> UnitWrap<In, Out, Resp, M>
    where
        In: Default + Clone + Send + 'static,
        Out: Send + 'static,
    {
        UnitWrap { inner: Wrap::new(Arc::clone(&self.mapper)).ingress(Ingress::cloned()) }
    }

    pub fn wrap_direct<In>(&self) -> UnitWrap<In, Resp, Resp, M>
    where
        In: Default + Clone + Send + 'static,
    {
        self.wrap().direct(DirectConvert::Skip)
    }
}

impl<Resp, M> Clone for UnitContract<Resp, M> {
    fn clone(&self) -> Self {
        Self { mapper: Arc::clone(&self.mapper), _phantom: PhantomData }
    }
}

impl<Resp, M> fmt::Debug for UnitContract<Resp, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitContract")
            .field("response", &type_name::<Resp>())
            .field("mapper", &type_name::<M>())
            .finish()
    }
}

enum Tail<Req, Out, Resp> {
    Mapped(Convert<Req, Out, Resp>),
    Direct { into_response: fn(Out) -> Resp, convert: DirectConvert<Req, Resp> },
}

/// Collects the stages of one pipeline, see [`Contract::wrap`].
pub struct Wrap<Req, In, Out, Resp, M> {
    mapper: Arc<M>,
    ingress: Ingress<Req, In>,
    prep: Prep<Req, In>,
    action: Action<In, Out>,
    tail: Tail<Req, Out, Resp>,
}

impl<Req, In, Out, Resp, M> Wrap<Req, In, Out, Resp, M>
where
    Req: Send + 'static,
    In: Send + 'static,
    Out: Send + 'static,
    Resp: Send + 'static,
    M: Mapper + 'static,
{
    fn new(mapper: Arc<M>) -> Self {
        Self {
            mapper,
            ingress: Ingress::Mapped,
            prep: Prep::Skip,
            action: Action::Unset,
            tail: Tail::Mapped(Convert::Skip),
        }
    }

    pub fn ingress(self, ingress: Ingress<Req, In>) -> Self {
        Self { ingress, ..self }
    }

    pub fn prep(self, prep: Prep<Req, In>) -> Self {
        Self { prep, ..self }
    }

    pub fn action(self, action: Action<In, Out>) -> Self {
        Self { action, ..self }
    }

    /// Map the output into the response, then run `convert` on it
    ///
    /// Replaces an earlier [`direct`](Wrap::direct) choice.
    pub fn convert(self, convert: Convert<Req, Out, Resp>) -> Self {
        Self { tail: Tail::Mapped(convert), ..self }
    }

    /// Compose the stages into a pipeline.
    ///
    /// Without an action the result is [`Pipeline::noop`]: calls return `Ok(None)` and neither
    /// the mapper, prep nor convert ever run.
    pub fn build(self) -> Pipeline<Req, Resp> {
        let Some(action) = self.action.into_async() else {
            warn!(
                request = type_name::<Req>(),
                response = type_name::<Resp>(),
                "pipeline built without an action, it will never produce a response"
            );
            return Pipeline::noop();
        };

        let composed =
            Arc::new(Composed { mapper: self.mapper, ingress: self.ingress, prep: self.prep, action, tail: self.tail });

        Pipeline::from_fn(move |request: Req| {
            let span = debug_span!("pipeline", request = type_name::<Req>(), response = type_name::<Resp>());
            Arc::clone(&composed).invoke(request).instrument(span)
        })
    }
}

impl<Req, In, Resp, M> Wrap<Req, In, Resp, Resp, M> {
    /// Use the action's output as the response, then run `convert` on it
    ///
    /// Replaces an earlier [`convert`](Wrap::convert) choice.
    pub fn direct(self, convert: DirectConvert<Req, Resp>) -> Self {
        Self { tail: Tail::Direct { into_response: identity, convert }, ..self }
    }
}

impl<Req, In, Out, Resp, M> fmt::Debug for Wrap<Req, In, Out, Resp, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail = match &self.tail {
            Tail::Mapped(convert) => format!("Mapped({convert:?})"),
            Tail::Direct { convert, .. } => format!("Direct({convert:?})"),
        };
        f.debug_struct("Wrap")
            .field("ingress", &self.ingress)
            .field("prep", &self.prep)
            .field("action", &self.action)
            .field("tail", &tail)
            .finish_non_exhaustive()
    }
}

/// Collects the stages of one parameterless pipeline, see [`UnitContract::wrap`].
pub struct UnitWrap<In, Out, Resp, M> {
    inner: Wrap<In, In, Out, Resp, M>,
}

impl<In, Out, Resp, M> UnitWrap<In, Out, Resp, M>
where
    In: Default + Clone + Send + 'static,
    Out: Send + 'static,
    Resp: Send + 'static,
    M: Mapper + 'static,
{
    pub fn prep(self, prep: UnitPrep<In>) -> Self {
        Self { inner: self.inner.prep(prep.into_prep()) }
    }

    pub fn action(self, action: Action<In, Out>) -> Self {
        Self { inner: self.inner.action(action) }
    }

    pub fn convert(self, convert: Convert<In, Out, Resp>) -> Self {
        Self { inner: self.inner.convert(convert) }
    }

    pub fn build(self) -> UnitPipeline<Resp> {
        let pipeline = self.inner.build();
        if pipeline.is_noop() {
            return UnitPipeline::noop();
        }

        UnitPipeline::from_fn(move || pipeline.call(In::default()))
    }
}

impl<In, Resp, M> UnitWrap<In, Resp, Resp, M> {
    pub fn direct(self, convert: DirectConvert<In, Resp>) -> Self {
        Self { inner: self.inner.direct(convert) }
    }
}

impl<In, Out, Resp, M> fmt::Debug for UnitWrap<In, Out, Resp, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitWrap").field("inner", &self.inner).finish()
    }
}

struct Composed<Req, In, Out, Resp, M> {
    mapper: Arc<M>,
    ingress: Ingress<Req, In>,
    prep: Prep<Req, In>,
    action: AsyncActionFn<In, Out>,
    tail: Tail<Req, Out, Resp>,
}

impl<Req, In, Out, Resp, M> Composed<Req, In, Out, Resp, M>
where
    Req: Send + 'static,
    In: Send + 'static,
    Out: Send + 'static,
    Resp: Send + 'static,
    M: Mapper + 'static,
{
    async fn invoke(self: Arc<Self>, request: Req) -> PipelineResult<Resp> {
        match self.run(request).await {
            Ok(response) => Ok(Some(response)),
            Err(e) => {
                debug!(cause = %e, "pipeline failed");
                Err(e)
            }
        }
    }

    async fn run(&self, request: Req) -> StageResult<Resp> {
        trace!("ingress");
        let input = self.ingress.run(&self.mapper, &request)?;

        trace!("prep");
        let (request, input) = self.prep.run(request, input).await?;

        trace!("action");
        let output = (self.action)(input).await?;

        match &self.tail {
            Tail::Mapped(convert) => {
                trace!("map response");
                let response = self.mapper.map::<Out, Resp>(&output)?;
                convert.run(request, output, response).await
            }
            Tail::Direct { into_response, convert } => {
                trace!("direct response");
                convert.run(request, into_response(output)).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Contract, UnitContract};
    use crate::error::{BoxError, MapError, StageResult};
    use crate::mapper::{Mapper, MapperRegistry};
    use crate::stage::{Action, Convert, DirectConvert, Ingress, Prep, UnitPrep};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct UserRequest {
        id: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct UserQuery {
        user_id: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        name: String,
        serial: usize,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct UserResponse {
        user_name: String,
        status: u16,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Page {
        size: u16,
    }

    struct CountingMapper {
        inner: MapperRegistry,
        calls: AtomicUsize,
    }

    impl CountingMapper {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Mapper for CountingMapper {
        fn map<S: 'static, T: 'static>(&self, source: &S) -> Result<T, MapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.map(source)
        }
    }

    fn mapper() -> Arc<CountingMapper> {
        let inner = MapperRegistry::builder()
            .register(|request: &UserRequest| UserQuery { user_id: request.id })
            .register(|user: &User| UserResponse { user_name: user.name.clone(), status: 200 })
            .build();
        Arc::new(CountingMapper { inner, calls: AtomicUsize::new(0) })
    }

    fn contract(mapper: &Arc<CountingMapper>) -> Contract<UserRequest, UserResponse, CountingMapper> {
        Contract::new(Arc::clone(mapper))
    }

    async fn find_user(query: UserQuery) -> StageResult<User> {
        match query.user_id {
            5 => Ok(User { name: "Ann".into(), serial: 0 }),
            id => Err(format!("user {id} not found").into()),
        }
    }

    #[tokio::test]
    async fn test_maps_request_action_and_response() {
        let mapper = mapper();
        let pipeline = contract(&mapper).wrap::<UserQuery, User>().action(Action::async_fn(find_user)).build();

        let response = pipeline.call(UserRequest { id: 5 }).await.unwrap();

        assert_eq!(response, Some(UserResponse { user_name: "Ann".into(), status: 200 }));
        assert_eq!(mapper.calls(), 2);
    }

    #[tokio::test]
    async fn test_prep_output_feeds_action() {
        let mapper = mapper();
        let seen = Arc::new(AtomicU32::new(0));
        let seen_by_action = Arc::clone(&seen);

        let pipeline = contract(&mapper)
            .wrap::<UserQuery, User>()
            .prep(Prep::sync(|request: UserRequest, mut query: UserQuery| {
                query.user_id += 4;
                Ok((request, query))
            }))
            .action(Action::async_fn(move |query: UserQuery| {
                seen_by_action.store(query.user_id, Ordering::SeqCst);
                find_user(query)
            }))
            .build();

        let response = pipeline.call(UserRequest { id: 1 }).await.unwrap().unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert_eq!(response.user_name, "Ann");
    }

    #[tokio::test]
    async fn test_async_prep_is_awaited_before_action() {
        let mapper = mapper();
        let pipeline = contract(&mapper)
            .wrap::<UserQuery, User>()
            .prep(Prep::async_fn(|request: UserRequest, mut query: UserQuery| async move {
                tokio::task::yield_now().await;
                query.user_id = 5;
                Ok::<_, BoxError>((request, query))
            }))
            .action(Action::async_fn(find_user))
            .build();

        let response = pipeline.call(UserRequest { id: 42 }).await.unwrap().unwrap();
        assert_eq!(response.user_name, "Ann");
    }

    #[tokio::test]
    async fn test_prep_modified_request_reaches_convert() {
        let mapper = mapper();
        let pipeline = contract(&mapper)
            .wrap::<UserQuery, User>()
            .prep(Prep::sync(|_request: UserRequest, query: UserQuery| Ok((UserRequest { id: 99 }, query))))
            .action(Action::async_fn(find_user))
            .convert(Convert::sync(|request: UserRequest, _user: User, mut response: UserResponse| {
                response.user_name = format!("{}#{}", response.user_name, request.id);
                Ok(response)
            }))
            .build();

        let response = pipeline.call(UserRequest { id: 5 }).await.unwrap().unwrap();
        assert_eq!(response.user_name, "Ann#99");
    }

    #[tokio::test]
    async fn test_unset_action_short_circuits() {
        let mapper = mapper();
        let prep_calls = Arc::new(AtomicUsize::new(0));
        let convert_calls = Arc::new(AtomicUsize::new(0));
        let (prep_counter, convert_counter) = (Arc::clone(&prep_calls), Arc::clone(&convert_calls));

        let pipeline = contract(&mapper)
            .wrap::<UserQuery, User>()
            .prep(Prep::sync(move |request: UserRequest, query: UserQuery| {
                prep_counter.fetch_add(1, Ordering::SeqCst);
                Ok((request, query))
            }))
            .convert(Convert::sync(move |_request: UserRequest, _user: User, response: UserResponse| {
                convert_counter.fetch_add(1, Ordering::SeqCst);
                Ok(response)
            }))
            .build();

        assert!(pipeline.is_noop());
        let response = pipeline.call(UserRequest { id: 5 }).await.unwrap();

        assert!(response.is_none());
        assert_eq!(mapper.calls(), 0);
        assert_eq!(prep_calls.load(Ordering::SeqCst), 0);
        assert_eq!(convert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_convert_result_is_final_and_sees_action_output() {
        let mapper = mapper();
        let serials = Arc::new(AtomicUsize::new(0));
        let seen_by_convert = Arc::new(AtomicUsize::new(usize::MAX));
        let (serial_source, seen) = (Arc::clone(&serials), Arc::clone(&seen_by_convert));

        let pipeline = contract(&mapper)
            .wrap::<UserQuery, User>()
            .action(Action::sync(move |_query: UserQuery| {
                let serial = serial_source.fetch_add(1, Ordering::SeqCst) + 100;
                Ok(User { name: "Ann".into(), serial })
            }))
            .convert(Convert::async_fn(move |_request: UserRequest, user: User, mut response: UserResponse| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.store(user.serial, Ordering::SeqCst);
                    response.status = 201;
                    Ok::<_, BoxError>(response)
                }
            }))
            .build();

        let response = pipeline.call(UserRequest { id: 5 }).await.unwrap().unwrap();

        assert_eq!(response, UserResponse { user_name: "Ann".into(), status: 201 });
        assert_eq!(seen_by_convert.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn test_direct_variant_skips_response_mapping() {
        let mapper = mapper();
        let pipeline = contract(&mapper)
            .wrap_direct::<UserQuery>()
            .action(Action::sync(|query: UserQuery| {
                Ok(UserResponse { user_name: format!("user-{}", query.user_id), status: 200 })
            }))
            .direct(DirectConvert::sync(|request: UserRequest, mut response: UserResponse| {
                response.status += u16::try_from(request.id)?;
                Ok(response)
            }))
            .build();

        let response = pipeline.call(UserRequest { id: 3 }).await.unwrap().unwrap();

        assert_eq!(response, UserResponse { user_name: "user-3".into(), status: 203 });
        assert_eq!(mapper.calls(), 1);
    }

    #[tokio::test]
    async fn test_derived_ingress_bypasses_mapper() {
        let mapper = mapper();
        let pipeline = contract(&mapper)
            .wrap::<UserQuery, User>()
            .ingress(Ingress::derived(|request: &UserRequest| Ok(UserQuery { user_id: request.id * 5 })))
            .action(Action::async_fn(find_user))
            .build();

        let response = pipeline.call(UserRequest { id: 1 }).await.unwrap().unwrap();

        assert_eq!(response.user_name, "Ann");
        assert_eq!(mapper.calls(), 1);
    }

    #[tokio::test]
    async fn test_mapper_error_propagates() {
        let mapper = Arc::new(MapperRegistry::builder().build());
        let pipeline = Contract::<UserRequest, UserResponse, _>::new(mapper)
            .wrap::<UserQuery, User>()
            .action(Action::async_fn(find_user))
            .build();

        let error = pipeline.call(UserRequest { id: 5 }).await.unwrap_err();

        match error.downcast_ref::<MapError>() {
            Some(MapError::Unmapped { source_type, target_type }) => {
                assert!(source_type.ends_with("UserRequest"));
                assert!(target_type.ends_with("UserQuery"));
            }
            other => panic!("expected unmapped error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_action_error_skips_convert() {
        let mapper = mapper();
        let convert_calls = Arc::new(AtomicUsize::new(0));
        let convert_counter = Arc::clone(&convert_calls);

        let pipeline = contract(&mapper)
            .wrap::<UserQuery, User>()
            .action(Action::async_fn(find_user))
            .convert(Convert::sync(move |_request: UserRequest, _user: User, response: UserResponse| {
                convert_counter.fetch_add(1, Ordering::SeqCst);
                Ok(response)
            }))
            .build();

        let error = pipeline.call(UserRequest { id: 7 }).await.unwrap_err();

        assert_eq!(error.to_string(), "user 7 not found");
        assert_eq!(convert_calls.load(Ordering::SeqCst), 0);
        assert_eq!(mapper.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invocations_are_independent() {
        let mapper = mapper();
        let pipeline = contract(&mapper)
            .wrap::<UserQuery, User>()
            .action(Action::async_fn(|query: UserQuery| async move {
                for _ in 0..(query.user_id % 3) {
                    tokio::task::yield_now().await;
                }
                Ok::<_, BoxError>(User { name: format!("user-{}", query.user_id), serial: 0 })
            }))
            .build();

        let handles = (0..64)
            .map(|id| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { (id, pipeline.call(UserRequest { id }).await) })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let (id, response) = handle.await.unwrap();
            assert_eq!(response.unwrap().unwrap().user_name, format!("user-{id}"));
        }
        assert_eq!(mapper.calls(), 128);
    }

    #[tokio::test]
    async fn test_unit_pipeline_starts_from_default_input() {
        let mapper = mapper();
        let pipeline = UnitContract::<UserResponse, _>::new(Arc::clone(&mapper))
            .wrap::<Page, User>()
            .prep(UnitPrep::sync(|mut page: Page| {
                page.size = 10;
                Ok(page)
            }))
            .action(Action::sync(|page: Page| Ok(User { name: format!("page-{}", page.size), serial: 0 })))
            .convert(Convert::sync(|page: Page, _user: User, mut response: UserResponse| {
                response.status = page.size;
                Ok(response)
            }))
            .build();

        let first = pipeline.call().await.unwrap().unwrap();
        let second = pipeline.call().await.unwrap().unwrap();

        assert_eq!(first, UserResponse { user_name: "page-10".into(), status: 10 });
        assert_eq!(first, second);
        assert_eq!(mapper.calls(), 2);
    }

    #[tokio::test]
    async fn test_unit_direct_and_noop() {
        let mapper = mapper();
        let contract = UnitContract::<UserResponse, _>::new(Arc::clone(&mapper));

        let direct = contract
            .wrap_direct::<Page>()
            .action(Action::sync(|page: Page| Ok(UserResponse { user_name: "direct".into(), status: page.size })))
            .build();
        assert_eq!(direct.call().await.unwrap().unwrap().status, 0);

        let noop = contract.wrap::<Page, User>().build();
        assert!(noop.is_noop());
        assert!(noop.call().await.unwrap().is_none());
        assert_eq!(mapper.calls(), 0);
    }
}
