//! `circles-contract` — the circle contract as one in-process state machine.
//!
//! Composes the registry, membership and catalog aggregates behind
//! [`CircleContract`], which serializes writes, publishes notifications in
//! commit order and serves paginated reads as structured [`Page`]s
//! (with [`Page::encode`] for the flattened string form).
//!
//! [`Page`]: circles_codec::Page
//! [`Page::encode`]: circles_codec::Page::encode

pub mod config;
pub mod contract;
mod ledger;
pub mod notification;
pub mod records;

pub use config::ContractConfig;
pub use contract::{CircleContract, DefaultBus};
pub use notification::{Notification, Receipt};
pub use records::{ApplicationRecord, CircleRecord, MemberRecord, ProductRecord};

pub use circles_codec::{Page, PageRequest};
pub use circles_core::{DomainError, DomainResult, ErrorKind, Missing, ProductId};
