//! Stage descriptors for a [`Wrap`](crate::Wrap) builder.
//!
//! Every optional step of a pipeline is described by a small enum rather than by a dedicated
//! overload: a stage is either skipped, a plain function, or a function returning a future.
//! The builder threads one value through them in a fixed order:
//!
//! ```text
//! Ingress -> Prep -> Action -> (Mapper | direct) -> Convert
//! ```

use crate::error::StageResult;
use crate::mapper::Mapper;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use std::fmt;
use std::future::Future;

type DeriveFn<Req, In> = Box<dyn Fn(&Req) -> StageResult<In> + Send + Sync>;

type PrepFn<Req, In> = Box<dyn Fn(Req, In) -> StageResult<(Req, In)> + Send + Sync>;
type AsyncPrepFn<Req, In> = Box<dyn Fn(Req, In) -> BoxFuture<'static, StageResult<(Req, In)>> + Send + Sync>;

type ActionFn<In, Out> = Box<dyn Fn(In) -> StageResult<Out> + Send + Sync>;
pub(crate) type AsyncActionFn<In, Out> = Box<dyn Fn(In) -> BoxFuture<'static, StageResult<Out>> + Send + Sync>;

type ConvertFn<Req, Out, Resp> = Box<dyn Fn(Req, Out, Resp) -> StageResult<Resp> + Send + Sync>;
type AsyncConvertFn<Req, Out, Resp> = Box<dyn Fn(Req, Out, Resp) -> BoxFuture<'static, StageResult<Resp>> + Send + Sync>;

type DirectConvertFn<Req, Resp> = Box<dyn Fn(Req, Resp) -> StageResult<Resp> + Send + Sync>;
type AsyncDirectConvertFn<Req, Resp> = Box<dyn Fn(Req, Resp) -> BoxFuture<'static, StageResult<Resp>> + Send + Sync>;

type UnitPrepFn<In> = Box<dyn Fn(In) -> StageResult<In> + Send + Sync>;
type AsyncUnitPrepFn<In> = Box<dyn Fn(In) -> BoxFuture<'static, StageResult<In>> + Send + Sync>;

/// How the domain input is produced from the request.
pub enum Ingress<Req, In> {
    /// Ask the contract's [`Mapper`] for an `In`
    Mapped,
    /// Derive the input with a function, the mapper is not consulted
    Derived(DeriveFn<Req, In>),
}

impl<Req, In> Ingress<Req, In> {
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&Req) -> StageResult<In> + Send + Sync + 'static,
    {
        Self::Derived(Box::new(f))
    }

    pub(crate) fn run<M: Mapper>(&self, mapper: &M, request: &Req) -> StageResult<In>
    where
        Req: 'static,
        In: 'static,
    {
        match self {
            Self::Mapped => Ok(mapper.map(request)?),
            Self::Derived(f) => f(request),
        }
    }
}

impl<Req: Clone + 'static> Ingress<Req, Req> {
    /// Use a clone of the request itself as the domain input
    pub fn cloned() -> Self {
        Self::derived(|request: &Req| Ok(request.clone()))
    }
}

/// Runs before the action with the request and the domain input.
///
/// It may replace both: the returned input is what the action receives, the returned request is
/// what [`Convert`] receives.
pub enum Prep<Req, In> {
    Skip,
    Sync(PrepFn<Req, In>),
    Async(AsyncPrepFn<Req, In>),
}

impl<Req, In> Prep<Req, In> {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Req, In) -> StageResult<(Req, In)> + Send + Sync + 'static,
    {
        Self::Sync(Box::new(f))
    }

    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Req, In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageResult<(Req, In)>> + Send + 'static,
    {
        Self::Async(Box::new(move |request: Req, input: In| f(request, input).boxed()))
    }

    pub(crate) async fn run(&self, request: Req, input: In) -> StageResult<(Req, In)> {
        match self {
            Self::Skip => Ok((request, input)),
            Self::Sync(f) => f(request, input),
            Self::Async(f) => f(request, input).await,
        }
    }
}

/// The domain action: turns the domain input into the domain output.
///
/// A pipeline built with [`Action::Unset`] never produces a response, see
/// [`Wrap::build`](crate::Wrap::build).
pub enum Action<In, Out> {
    Unset,
    Sync(ActionFn<In, Out>),
    Async(AsyncActionFn<In, Out>),
}

impl<In, Out> Action<In, Out> {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(In) -> StageResult<Out> + Send + Sync + 'static,
    {
        Self::Sync(Box::new(f))
    }

    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageResult<Out>> + Send + 'static,
    {
        Self::Async(Box::new(move |input: In| f(input).boxed()))
    }

    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Lift the action into its asynchronous form, `None` if it is unset
    pub(crate) fn into_async(self) -> Option<AsyncActionFn<In, Out>>
    where
        In: 'static,
        Out: Send + 'static,
    {
        match self {
            Self::Unset => None,
            Self::Sync(f) => Some(Box::new(move |input: In| future::ready(f(input)).boxed())),
            Self::Async(f) => Some(f),
        }
    }
}

/// Runs last with the request, the domain output and the mapped response.
///
/// Its return value replaces the mapped response.
pub enum Convert<Req, Out, Resp> {
    Skip,
    Sync(ConvertFn<Req, Out, Resp>),
    Async(AsyncConvertFn<Req, Out, Resp>),
}

impl<Req, Out, Resp> Convert<Req, Out, Resp> {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Req, Out, Resp) -> StageResult<Resp> + Send + Sync + 'static,
    {
        Self::Sync(Box::new(f))
    }

    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Req, Out, Resp) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageResult<Resp>> + Send + 'static,
    {
        Self::Async(Box::new(move |request: Req, output: Out, response: Resp| f(request, output, response).boxed()))
    }

    pub(crate) async fn run(&self, request: Req, output: Out, response: Resp) -> StageResult<Resp> {
        match self {
            Self::Skip => Ok(response),
            Self::Sync(f) => f(request, output, response),
            Self::Async(f) => f(request, output, response).await,
        }
    }
}

/// [`Convert`] for pipelines whose action already yields the response type.
pub enum DirectConvert<Req, Resp> {
    Skip,
    Sync(DirectConvertFn<Req, Resp>),
    Async(AsyncDirectConvertFn<Req, Resp>),
}

impl<Req, Resp> DirectConvert<Req, Resp> {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Req, Resp) -> StageResult<Resp> + Send + Sync + 'static,
    {
        Self::Sync(Box::new(f))
    }

    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Req, Resp) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageResult<Resp>> + Send + 'static,
    {
        Self::Async(Box::new(move |request: Req, response: Resp| f(request, response).boxed()))
    }

    pub(crate) async fn run(&self, request: Req, response: Resp) -> StageResult<Resp> {
        match self {
            Self::Skip => Ok(response),
            Self::Sync(f) => f(request, response),
            Self::Async(f) => f(request, response).await,
        }
    }
}

/// [`Prep`] for parameterless pipelines, where the freshly built input is the only value around.
pub enum UnitPrep<In> {
    Skip,
    Sync(UnitPrepFn<In>),
    Async(AsyncUnitPrepFn<In>),
}

impl<In> UnitPrep<In> {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(In) -> StageResult<In> + Send + Sync + 'static,
    {
        Self::Sync(Box::new(f))
    }

    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageResult<In>> + Send + 'static,
    {
        Self::Async(Box::new(move |input: In| f(input).boxed()))
    }

    /// The prepared input doubles as the request that [`Convert`] later receives.
    pub(crate) fn into_prep(self) -> Prep<In, In>
    where
        In: Clone + Send + 'static,
    {
        match self {
            Self::Skip => Prep::Skip,
            Self::Sync(f) => Prep::Sync(Box::new(move |_request: In, input: In| {
                let input = f(input)?;
                Ok((input.clone(), input))
            })),
            Self::Async(f) => Prep::Async(Box::new(move |_request: In, input: In| {
                f(input).map(|prepared| prepared.map(|input| (input.clone(), input))).boxed()
            })),
        }
    }
}

macro_rules! impl_debug_for_stage {
    ($stage:ident<$($param:ident),+>, $($variant:ident)+) => {
        impl<$($param,)+> fmt::Debug for $stage<$($param,)+> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(
                    Self::$variant { .. } => f.write_str(concat!(stringify!($stage), "::", stringify!($variant))),
                    )+
                }
            }
        }
    };
}

macro_rules! impl_default_for_stage {
    ($stage:ident<$($param:ident),+>, $variant:ident) => {
        impl<$($param,)+> Default for $stage<$($param,)+> {
            #[inline]
            fn default() -> Self {
                Self::$variant
            }
        }
    };
}

impl_default_for_stage! { Ingress<Req, In>, Mapped }
impl_default_for_stage! { Prep<Req, In>, Skip }
impl_default_for_stage! { Action<In, Out>, Unset }
impl_default_for_stage! { Convert<Req, Out, Resp>, Skip }
impl_default_for_stage! { DirectConvert<Req, Resp>, Skip }
impl_default_for_stage! { UnitPrep<In>, Skip }

impl_debug_for_stage! { Ingress<Req, In>, Mapped Derived }
impl_debug_for_stage! { Prep<Req, In>, Skip Sync Async }
impl_debug_for_stage! { Action<In, Out>, Unset Sync Async }
impl_debug_for_stage! { Convert<Req, Out, Resp>, Skip Sync Async }
impl_debug_for_stage! { DirectConvert<Req, Resp>, Skip Sync Async }
impl_debug_for_stage! { UnitPrep<In>, Skip Sync Async }

#[cfg(test)]
mod tests {
    use super::{Action, Convert, DirectConvert, Ingress, Prep, UnitPrep};
    use crate::error::BoxError;
    use crate::mapper::MapperRegistry;

    #[derive(Debug, Clone, PartialEq)]
    struct Order {
        id: u32,
    }

    #[test]
    fn test_defaults_are_no_ops() {
        assert!(matches!(Ingress::<Order, Order>::default(), Ingress::Mapped));
        assert!(matches!(Prep::<Order, Order>::default(), Prep::Skip));
        assert!(Action::<Order, Order>::default().is_unset());
        assert!(matches!(Convert::<Order, Order, Order>::default(), Convert::Skip));
        assert!(matches!(DirectConvert::<Order, Order>::default(), DirectConvert::Skip));
        assert!(matches!(UnitPrep::<Order>::default(), UnitPrep::Skip));
    }

    #[test]
    fn test_debug_names_the_variant() {
        let action = Action::sync(|order: Order| Ok::<_, BoxError>(order));
        assert_eq!(format!("{action:?}"), "Action::Sync");
        assert_eq!(format!("{:?}", Prep::<Order, Order>::Skip), "Prep::Skip");
    }

    #[test]
    fn test_cloned_ingress_ignores_mapper() {
        let mapper = MapperRegistry::builder().build();
        let ingress = Ingress::<Order, Order>::cloned();

        let input = ingress.run(&mapper, &Order { id: 3 }).unwrap();
        assert_eq!(input, Order { id: 3 });
    }

    #[tokio::test]
    async fn test_skipped_stages_pass_values_through() {
        let prep = Prep::<Order, Order>::Skip;
        let (request, input) = prep.run(Order { id: 1 }, Order { id: 2 }).await.unwrap();
        assert_eq!((request.id, input.id), (1, 2));

        let convert = Convert::<Order, Order, Order>::Skip;
        let response = convert.run(Order { id: 1 }, Order { id: 2 }, Order { id: 3 }).await.unwrap();
        assert_eq!(response.id, 3);
    }

    #[tokio::test]
    async fn test_sync_action_is_lifted_into_async() {
        let action = Action::sync(|order: Order| Ok::<_, BoxError>(order.id * 2)).into_async().unwrap();
        assert_eq!(action(Order { id: 21 }).await.unwrap(), 42);
        assert!(Action::<Order, u32>::Unset.into_async().is_none());
    }

    #[tokio::test]
    async fn test_unit_prep_feeds_both_request_and_input() {
        let prep = UnitPrep::async_fn(|mut order: Order| async move {
            order.id += 1;
            Ok::<_, BoxError>(order)
        })
        .into_prep();

        let (request, input) = prep.run(Order { id: 0 }, Order { id: 9 }).await.unwrap();
        assert_eq!(request, Order { id: 10 });
        assert_eq!(input, Order { id: 10 });
    }
}
