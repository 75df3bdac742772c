use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use circles_core::{Aggregate, AggregateRoot, CircleId, Did, DomainError, Missing, ProductId};
use circles_events::Event;

/// Review state of a listing. Ordinals are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Pending,
    Approved,
}

impl AuditStatus {
    pub fn ordinal(self) -> u8 {
        match self {
            AuditStatus::Pending => 0,
            AuditStatus::Approved => 1,
        }
    }
}

/// Aggregate root: Product listed in a circle by one of its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    circle_id: CircleId,
    owner: Did,
    name: String,
    /// Decimal as entered by the owner; never parsed.
    price: String,
    category: u8,
    ipfs_hash: String,
    audit_status: AuditStatus,
    on_shelf: bool,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            circle_id: CircleId::from(""),
            owner: Did::from(""),
            name: String::new(),
            price: String::new(),
            category: 0,
            ipfs_hash: String::new(),
            audit_status: AuditStatus::Pending,
            on_shelf: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn circle_id(&self) -> &CircleId {
        &self.circle_id
    }

    pub fn owner(&self) -> &Did {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn category(&self) -> u8 {
        self.category
    }

    pub fn ipfs_hash(&self) -> &str {
        &self.ipfs_hash
    }

    pub fn audit_status(&self) -> AuditStatus {
        self.audit_status
    }

    pub fn is_on_shelf(&self) -> bool {
        self.on_shelf
    }

    /// Approved and on the shelf.
    pub fn is_listed(&self) -> bool {
        self.audit_status == AuditStatus::Approved && self.on_shelf
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if self.created {
            Ok(())
        } else {
            Err(DomainError::not_found(Missing::Product))
        }
    }

    fn ensure_owner(&self, caller: &Did) -> Result<(), DomainError> {
        if self.owner == *caller {
            Ok(())
        } else {
            Err(DomainError::NotProductOwner)
        }
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct. Membership of `owner` is checked before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub circle_id: CircleId,
    pub owner: Did,
    pub name: String,
    pub price: String,
    pub category: u8,
    pub ipfs_hash: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveProduct. Circle-owner authorization happens before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveProduct {
    pub product_id: ProductId,
    /// Circle the approver is acting for; must be the product's circle.
    pub circle_id: CircleId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditProduct {
    pub product_id: ProductId,
    pub caller: Did,
    pub name: String,
    pub price: String,
    pub ipfs_hash: String,
    /// Also take the product off the shelf.
    pub unshelve: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetShelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetShelf {
    pub product_id: ProductId,
    pub caller: Did,
    pub on_shelf: bool,
    /// Refuse to shelve a product whose audit is still pending.
    pub require_approval: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ApproveProduct(ApproveProduct),
    EditProduct(EditProduct),
    SetShelf(SetShelf),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub circle_id: CircleId,
    pub owner: Did,
    pub name: String,
    pub price: String,
    pub category: u8,
    pub ipfs_hash: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductApproved {
    pub product_id: ProductId,
    pub circle_id: CircleId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductEdited. Always resets the audit to pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEdited {
    pub product_id: ProductId,
    pub name: String,
    pub price: String,
    pub ipfs_hash: String,
    pub unshelved: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductShelfChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductShelfChanged {
    pub product_id: ProductId,
    pub on_shelf: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductApproved(ProductApproved),
    ProductEdited(ProductEdited),
    ProductShelfChanged(ProductShelfChanged),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "catalog.product.created",
            ProductEvent::ProductApproved(_) => "catalog.product.approved",
            ProductEvent::ProductEdited(_) => "catalog.product.edited",
            ProductEvent::ProductShelfChanged(_) => "catalog.product.shelf_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductApproved(e) => e.occurred_at,
            ProductEvent::ProductEdited(e) => e.occurred_at,
            ProductEvent::ProductShelfChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.circle_id = e.circle_id.clone();
                self.owner = e.owner.clone();
                self.name = e.name.clone();
                self.price = e.price.clone();
                self.category = e.category;
                self.ipfs_hash = e.ipfs_hash.clone();
                self.audit_status = AuditStatus::Pending;
                self.on_shelf = false;
                self.created = true;
            }
            ProductEvent::ProductApproved(_) => {
                self.audit_status = AuditStatus::Approved;
            }
            ProductEvent::ProductEdited(e) => {
                self.name = e.name.clone();
                self.price = e.price.clone();
                self.ipfs_hash = e.ipfs_hash.clone();
                self.audit_status = AuditStatus::Pending;
                if e.unshelved {
                    self.on_shelf = false;
                }
            }
            ProductEvent::ProductShelfChanged(e) => {
                self.on_shelf = e.on_shelf;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ApproveProduct(cmd) => self.handle_approve(cmd),
            ProductCommand::EditProduct(cmd) => self.handle_edit(cmd),
            ProductCommand::SetShelf(cmd) => self.handle_set_shelf(cmd),
        }
    }
}

impl Product {
    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::duplicate_id(cmd.product_id.to_string()));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            circle_id: cmd.circle_id.clone(),
            owner: cmd.owner.clone(),
            name: cmd.name.clone(),
            price: cmd.price.clone(),
            category: cmd.category,
            ipfs_hash: cmd.ipfs_hash.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created()?;
        if self.circle_id != cmd.circle_id {
            return Err(DomainError::WrongCircle);
        }

        Ok(vec![ProductEvent::ProductApproved(ProductApproved {
            product_id: self.id,
            circle_id: self.circle_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit(&self, cmd: &EditProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_owner(&cmd.caller)?;

        Ok(vec![ProductEvent::ProductEdited(ProductEdited {
            product_id: self.id,
            name: cmd.name.clone(),
            price: cmd.price.clone(),
            ipfs_hash: cmd.ipfs_hash.clone(),
            unshelved: cmd.unshelve && self.on_shelf,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_shelf(&self, cmd: &SetShelf) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_owner(&cmd.caller)?;

        if cmd.on_shelf && cmd.require_approval && self.audit_status != AuditStatus::Approved {
            return Err(DomainError::ProductNotApproved);
        }

        Ok(vec![ProductEvent::ProductShelfChanged(ProductShelfChanged {
            product_id: self.id,
            on_shelf: cmd.on_shelf,
            occurred_at: cmd.occurred_at,
        })])
    }
}
