//! Owner of every product record, in creation order, plus id allocation.

use indexmap::IndexMap;

use circles_core::{Aggregate, CircleId, DomainError, DomainResult, Missing, ProductId};

use crate::product::{CreateProduct, Product, ProductCommand, ProductEvent};

#[derive(Debug, Default, Clone)]
pub struct ProductCatalog {
    products: IndexMap<ProductId, Product>,
    last_id: u64,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next created product will get. Only advances on commit, so a
    /// rejected creation does not burn an id.
    pub fn next_id(&self) -> ProductId {
        ProductId::new(self.last_id + 1)
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn require(&self, id: ProductId) -> DomainResult<&Product> {
        self.get(id).ok_or(DomainError::not_found(Missing::Product))
    }

    pub fn decide_create(&self, cmd: CreateProduct) -> DomainResult<Vec<ProductEvent>> {
        let product = match self.products.get(&cmd.product_id) {
            Some(existing) => existing.clone(),
            None => Product::empty(cmd.product_id),
        };
        product.handle(&ProductCommand::CreateProduct(cmd))
    }

    pub fn decide(&self, id: ProductId, cmd: &ProductCommand) -> DomainResult<Vec<ProductEvent>> {
        self.require(id)?.handle(cmd)
    }

    pub fn commit(&mut self, id: ProductId, events: &[ProductEvent]) {
        if events.is_empty() {
            return;
        }
        self.products
            .entry(id)
            .or_insert_with(|| Product::empty(id))
            .apply_all(events);
        self.last_id = self.last_id.max(id.get());
    }

    /// All products across circles, in creation order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Product> {
        self.products.values()
    }

    /// Products of one circle, in creation order.
    pub fn in_circle<'a>(&'a self, circle_id: &'a CircleId) -> impl Iterator<Item = &'a Product> + 'a {
        self.products.values().filter(move |p| p.circle_id() == circle_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
