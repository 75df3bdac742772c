//! Product catalog: per-circle listings owned by members, with audit
//! approval, edit-triggered re-audit and shelf visibility.

pub mod catalog;
pub mod product;

pub use catalog::ProductCatalog;
pub use product::{
    ApproveProduct, AuditStatus, CreateProduct, EditProduct, Product, ProductApproved,
    ProductCommand, ProductCreated, ProductEdited, ProductEvent, ProductShelfChanged, SetShelf,
};
