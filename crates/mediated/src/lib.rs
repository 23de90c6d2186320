//! Data contracts whose domain action is a mediator dispatch
//!
//! A [`MediatedContract`] is a [`Contract`](data_contract::Contract) with the action fixed: the
//! domain input is a [`DispatchRequest`] and is sent through a [`Dispatcher`], its declared
//! output is the domain output. Callers only pick the prep and convert stages.
//!
//! Each dispatch runs under its own [`CancelScope`]. The scope is opened right before the request
//! is sent and released right after, whatever the outcome, so no cancellation token outlives the
//! dispatch it was made for. Pipelines are never cancelled internally, a host that wants to abort
//! in flight dispatches hands a parent token to
//! [`with_cancellation`](MediatedContract::with_cancellation).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use data_contract::{BoxError, Convert, MapperRegistry, Prep};
//! use mediated_contract::{
//!     CancellationToken, DefaultMediatedContractFactory, DispatchRequest, MediatedContractFactory, Mediator,
//! };
//!
//! struct UserRequest { id: u32 }
//! struct GetUser { user_id: u32 }
//! struct User { name: String }
//! #[derive(Debug, PartialEq)]
//! struct UserResponse { user_name: String }
//!
//! impl DispatchRequest for GetUser {
//!     type Output = User;
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), BoxError> {
//! let mapper = MapperRegistry::builder()
//!     .register(|request: &UserRequest| GetUser { user_id: request.id })
//!     .register(|user: &User| UserResponse { user_name: user.name.clone() })
//!     .build();
//!
//! let mediator = Mediator::builder()
//!     .handler(|query: GetUser, _cancel: CancellationToken| async move {
//!         Ok::<_, BoxError>(User { name: format!("user-{}", query.user_id) })
//!     })
//!     .build();
//!
//! let factory = DefaultMediatedContractFactory::new(Arc::new(mapper), Arc::new(mediator));
//! let pipeline = factory
//!     .create_contract::<UserRequest, UserResponse>()
//!     .mediate::<GetUser>(Prep::Skip, Convert::Skip);
//!
//! let response = pipeline.call(UserRequest { id: 5 }).await?;
//! assert_eq!(response, Some(UserResponse { user_name: "user-5".into() }));
//! # Ok(())
//! # }
//! ```

mod contract;
mod dispatcher;
mod error;
mod factory;
mod mediator;
mod scope;

pub use contract::{MediatedContract, UnitMediatedContract};
pub use dispatcher::{DispatchRequest, Dispatcher};
pub use error::DispatchError;
pub use factory::{DefaultMediatedContractFactory, MediatedContractFactory};
pub use mediator::{Mediator, MediatorBuilder};
pub use scope::CancelScope;

pub use tokio_util::sync::CancellationToken;
