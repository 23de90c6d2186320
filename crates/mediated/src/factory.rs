use crate::contract::{MediatedContract, UnitMediatedContract};
use crate::dispatcher::Dispatcher;
use data_contract::Mapper;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Hands out mediated contracts for caller chosen request and response types.
pub trait MediatedContractFactory {
    type Mapper: Mapper;
    type Dispatcher: Dispatcher;

    fn create_contract<Req, Resp>(&self) -> MediatedContract<Req, Resp, Self::Mapper, Self::Dispatcher>;

    fn create_unit_contract<Resp>(&self) -> UnitMediatedContract<Resp, Self::Mapper, Self::Dispatcher>;
}

/// A [`MediatedContractFactory`] binding one shared mapper and one shared dispatcher.
pub struct DefaultMediatedContractFactory<M, D> {
    mapper: Arc<M>,
    dispatcher: Arc<D>,
    parent: Option<CancellationToken>,
}

impl<M: Mapper, D: Dispatcher> DefaultMediatedContractFactory<M, D> {
    pub fn new(mapper: Arc<M>, dispatcher: Arc<D>) -> Self {
        Self { mapper, dispatcher, parent: None }
    }

    /// Every contract created afterwards opens its dispatch scopes under `parent`
    #[must_use]
    pub fn with_cancellation(self, parent: CancellationToken) -> Self {
        Self { parent: Some(parent), ..self }
    }

    pub fn mapper(&self) -> &Arc<M> {
        &self.mapper
    }

    pub fn dispatcher(&self) -> &Arc<D> {
        &self.dispatcher
    }
}

impl<M: Mapper, D: Dispatcher> MediatedContractFactory for DefaultMediatedContractFactory<M, D> {
    type Mapper = M;
    type Dispatcher = D;

    fn create_contract<Req, Resp>(&self) -> MediatedContract<Req, Resp, M, D> {
        let contract = MediatedContract::new(Arc::clone(&self.mapper), Arc::clone(&self.dispatcher));
        match &self.parent {
            Some(parent) => contract.with_cancellation(parent.clone()),
            None => contract,
        }
    }

    fn create_unit_contract<Resp>(&self) -> UnitMediatedContract<Resp, M, D> {
        let contract = UnitMediatedContract::new(Arc::clone(&self.mapper), Arc::clone(&self.dispatcher));
        match &self.parent {
            Some(parent) => contract.with_cancellation(parent.clone()),
            None => contract,
        }
    }
}

impl<M, D> Clone for DefaultMediatedContractFactory<M, D> {
    fn clone(&self) -> Self {
        Self { mapper: Arc::clone(&self.mapper), dispatcher: Arc::clone(&self.dispatcher), parent: self.parent.clone() }
    }
}

impl<M, D> fmt::Debug for DefaultMediatedContractFactory<M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultMediatedContractFactory")
            .field("mapper", &type_name::<M>())
            .field("dispatcher", &type_name::<D>())
            .field("parent", &self.parent)
            .finish()
    }
}
