use crate::contract::{Contract, UnitContract};
use crate::mapper::Mapper;
use std::sync::Arc;

/// Hands out contracts for caller chosen request and response types.
pub trait ContractFactory {
    type Mapper: Mapper;

    fn create_contract<Req, Resp>(&self) -> Contract<Req, Resp, Self::Mapper>;

    fn create_unit_contract<Resp>(&self) -> UnitContract<Resp, Self::Mapper>;
}

/// A [`ContractFactory`] binding one shared mapper.
///
/// Contracts are not cached, every call returns a fresh one pointing at the same mapper.
#[derive(Debug)]
pub struct DefaultContractFactory<M> {
    mapper: Arc<M>,
}

impl<M: Mapper> DefaultContractFactory<M> {
    pub fn new(mapper: Arc<M>) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &Arc<M> {
        &self.mapper
    }
}

impl<M> Clone for DefaultContractFactory<M> {
    fn clone(&self) -> Self {
        Self { mapper: Arc::clone(&self.mapper) }
    }
}

impl<M: Mapper> ContractFactory for DefaultContractFactory<M> {
    type Mapper = M;

    fn create_contract<Req, Resp>(&self) -> Contract<Req, Resp, M> {
        Contract::new(Arc::clone(&self.mapper))
    }

    fn create_unit_contract<Resp>(&self) -> UnitContract<Resp, M> {
        UnitContract::new(Arc::clone(&self.mapper))
    }
}
