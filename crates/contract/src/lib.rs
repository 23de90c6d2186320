//! Composable request/response data contracts
//!
//! This crate builds `Req -> Resp` functions out of a few optional stages: the request is mapped
//! into a domain input, an action turns that input into a domain output, and the output is mapped
//! into the response. A prep stage may adjust the request and input before the action runs, a
//! convert stage may rewrite the response afterwards.
//!
//! Object mapping is delegated to a [`Mapper`], the crate ships [`MapperRegistry`] as a simple
//! type-pair keyed implementation.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use data_contract::{Action, BoxError, ContractFactory, DefaultContractFactory, MapperRegistry};
//!
//! struct UserRequest { id: u32 }
//! struct UserQuery { user_id: u32 }
//! struct User { name: String }
//! #[derive(Debug, PartialEq)]
//! struct UserResponse { user_name: String }
//!
//! async fn find_user(query: UserQuery) -> Result<User, BoxError> {
//!     match query.user_id {
//!         5 => Ok(User { name: "Ann".into() }),
//!         id => Err(format!("user {id} not found").into()),
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), BoxError> {
//! let mapper = MapperRegistry::builder()
//!     .register(|request: &UserRequest| UserQuery { user_id: request.id })
//!     .register(|user: &User| UserResponse { user_name: user.name.clone() })
//!     .build();
//!
//! let factory = DefaultContractFactory::new(Arc::new(mapper));
//! let pipeline = factory
//!     .create_contract::<UserRequest, UserResponse>()
//!     .wrap::<UserQuery, User>()
//!     .action(Action::async_fn(find_user))
//!     .build();
//!
//! let response = pipeline.call(UserRequest { id: 5 }).await?;
//! assert_eq!(response, Some(UserResponse { user_name: "Ann".into() }));
//! # Ok(())
//! # }
//! ```
//!
//! # Stages
//!
//! Stages are plain enums, see [`Ingress`], [`Prep`], [`Action`], [`Convert`],
//! [`DirectConvert`] and [`UnitPrep`]. An absent prep or convert is skipped. An absent action
//! turns the whole pipeline into a no-op that answers `Ok(None)` without touching the mapper.
//!
//! # Errors
//!
//! Mapper errors ([`MapError`]) and errors returned by the stages are handed to the caller as a
//! [`BoxError`] and are never retried or wrapped.

mod contract;
mod error;
mod factory;
mod mapper;
mod pipeline;
mod stage;

pub use contract::{Contract, UnitContract, UnitWrap, Wrap};
pub use error::{BoxError, MapError, StageResult};
pub use factory::{ContractFactory, DefaultContractFactory};
pub use mapper::{Mapper, MapperRegistry, MapperRegistryBuilder};
pub use pipeline::{Pipeline, PipelineResult, UnitPipeline};
pub use stage::{Action, Convert, DirectConvert, Ingress, Prep, UnitPrep};
