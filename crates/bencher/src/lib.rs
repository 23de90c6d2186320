use data_contract::{MapperRegistry, StageResult};
use mediated_contract::DispatchRequest;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    items: usize,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, items: usize) -> Self {
        Self { name, group, items }
    }

    pub fn small(name: &'static str, items: usize) -> Self {
        Self::new(name, TestGroup::Small, items)
    }

    pub fn normal(name: &'static str, items: usize) -> Self {
        Self::new(name, TestGroup::Normal, items)
    }

    pub fn large(name: &'static str, items: usize) -> Self {
        Self::new(name, TestGroup::Large, items)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn items(&self) -> usize {
        self.items
    }

    /// A fresh request carrying `items` line items
    pub fn request(&self) -> OrderRequest {
        OrderRequest { id: 7, items: (0..self.items).map(|n| n as u32 % 100).collect() }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub id: u64,
    pub items: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: u64,
    pub items: Vec<u32>,
}

impl DispatchRequest for PlaceOrder {
    type Output = Receipt;
}

#[derive(Debug, Clone)]
pub struct Receipt {
    pub order_id: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct OrderResponse {
    pub order_id: u64,
    pub total: u64,
    pub accepted: bool,
}

pub fn order_mapper() -> MapperRegistry {
    MapperRegistry::builder()
        .register(|request: &OrderRequest| PlaceOrder { order_id: request.id, items: request.items.clone() })
        .register(|receipt: &Receipt| OrderResponse { order_id: receipt.order_id, total: receipt.total, accepted: true })
        .build()
}

pub fn place_order(order: PlaceOrder) -> StageResult<Receipt> {
    Ok(Receipt { order_id: order.order_id, total: order.items.iter().map(|&item| u64::from(item)).sum() })
}
