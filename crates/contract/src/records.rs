//! Boundary records returned by the read operations.
//!
//! Each is a plain structured value; the [`Record`] impls fix the wire field
//! names and order used by [`Page::encode`](circles_codec::Page::encode).

use serde::Serialize;

use circles_catalog::Product;
use circles_codec::{Record, encode_bool};
use circles_core::AggregateRoot;
use circles_membership::{Application, Member};
use circles_registry::Circle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircleRecord {
    pub id: String,
    pub name: String,
    pub owner_did: String,
    pub owner_org_name: String,
    pub disabled: bool,
}

impl From<&Circle> for CircleRecord {
    fn from(circle: &Circle) -> Self {
        Self {
            id: circle.id().to_string(),
            name: circle.name().to_string(),
            owner_did: circle.owner().did.to_string(),
            owner_org_name: circle.owner().org_name.clone(),
            disabled: circle.is_disabled(),
        }
    }
}

impl Record for CircleRecord {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("ownerDID", self.owner_did.clone()),
            ("ownerOrgName", self.owner_org_name.clone()),
            ("disabled", encode_bool(self.disabled).to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationRecord {
    pub applicant_did: String,
    pub applicant_org_name: String,
    pub credit_proof: String,
    /// 0 pending, 1 approved, 2 rejected.
    pub status: u8,
}

impl From<&Application> for ApplicationRecord {
    fn from(app: &Application) -> Self {
        Self {
            applicant_did: app.applicant.did.to_string(),
            applicant_org_name: app.applicant.org_name.clone(),
            credit_proof: app.credit_proof.clone(),
            status: app.status.ordinal(),
        }
    }
}

impl Record for ApplicationRecord {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("applicantDID", self.applicant_did.clone()),
            ("applicantOrgName", self.applicant_org_name.clone()),
            ("creditProof", self.credit_proof.clone()),
            ("status", self.status.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRecord {
    pub did: String,
    pub org_name: String,
}

impl From<&Member> for MemberRecord {
    fn from(member: &Member) -> Self {
        Self {
            did: member.identity.did.to_string(),
            org_name: member.identity.org_name.clone(),
        }
    }
}

impl Record for MemberRecord {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![("did", self.did.clone()), ("orgName", self.org_name.clone())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub id: String,
    pub circle_id: String,
    pub owner_did: String,
    pub name: String,
    pub price: String,
    pub category: u8,
    pub ipfs_hash: String,
    /// 0 pending, 1 approved.
    pub audit_status: u8,
    pub on_shelf: bool,
}

impl From<&Product> for ProductRecord {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id_typed().to_string(),
            circle_id: product.circle_id().to_string(),
            owner_did: product.owner().to_string(),
            name: product.name().to_string(),
            price: product.price().to_string(),
            category: product.category(),
            ipfs_hash: product.ipfs_hash().to_string(),
            audit_status: product.audit_status().ordinal(),
            on_shelf: product.is_on_shelf(),
        }
    }
}

impl Record for ProductRecord {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("circleId", self.circle_id.clone()),
            ("ownerDID", self.owner_did.clone()),
            ("name", self.name.clone()),
            ("price", self.price.clone()),
            ("category", self.category.to_string()),
            ("ipfsHash", self.ipfs_hash.clone()),
            ("auditStatus", self.audit_status.to_string()),
            ("onShelf", encode_bool(self.on_shelf).to_string()),
        ]
    }
}
