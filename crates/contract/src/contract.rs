//! The circle contract: one state machine instance exposing every write and
//! read operation.
//!
//! ## Execution model
//!
//! Every write runs under a single write lock:
//!
//! ```text
//! decide (pure handle() on each aggregate involved)
//!   ↓ any rejection → return the error, nothing changed, nothing emitted
//! commit (apply() every decided event, assign sequence numbers)
//!   ↓
//! publish (each envelope on the bus, in commit order)
//! ```
//!
//! so writes are atomic and totally ordered, and notifications arrive in
//! commit order. Reads share a read lock and always see a fully applied state.

use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use circles_catalog::{ApproveProduct, CreateProduct, EditProduct, ProductCommand, SetShelf};
use circles_codec::{Page, PageRequest, is_wire_safe};
use circles_core::{Aggregate, CircleId, Did, DomainError, DomainResult, Identity, ProductId};
use circles_events::{EventBus, EventEnvelope, InMemoryEventBus};
use circles_membership::{
    ApproveApplication, Enroll, ExitCircle, JoinReason, RejectApplication,
    RosterCommand, RosterEvent, SubmitApplication,
};
use circles_registry::{CircleCommand, CreateCircle, DisableCircle, TransferOwnership};

use crate::config::ContractConfig;
use crate::ledger::{Change, Ledger};
use crate::notification::{Notification, Receipt};
use crate::records::{ApplicationRecord, CircleRecord, MemberRecord, ProductRecord};

/// Bus type used when none is injected.
pub type DefaultBus = InMemoryEventBus<EventEnvelope<Notification>>;

#[derive(Debug)]
pub struct CircleContract<B = DefaultBus> {
    instance_id: Uuid,
    config: ContractConfig,
    ledger: RwLock<Ledger>,
    bus: B,
}

impl CircleContract<DefaultBus> {
    /// Construct a fresh, empty contract with an in-memory bus.
    pub fn new(config: ContractConfig) -> Self {
        Self::with_bus(config, DefaultBus::new())
    }
}

impl Default for CircleContract<DefaultBus> {
    fn default() -> Self {
        Self::new(ContractConfig::default())
    }
}

impl<B> CircleContract<B>
where
    B: EventBus<EventEnvelope<Notification>>,
{
    pub fn with_bus(config: ContractConfig, bus: B) -> Self {
        Self {
            instance_id: Uuid::now_v7(),
            config,
            ledger: RwLock::new(Ledger::default()),
            bus,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// First page at the configured default size.
    pub fn default_page(&self) -> PageRequest {
        PageRequest::first(self.config.default_page_size)
    }

    // ----------------------------------------------------------------------
    // Circle registry
    // ----------------------------------------------------------------------

    /// Create a circle; the owner becomes its first member.
    #[instrument(skip(self))]
    pub fn create_circle(
        &self,
        id: &str,
        name: &str,
        owner_did: &str,
        owner_org_name: &str,
    ) -> DomainResult<Receipt> {
        let circle_id = CircleId::from(id);
        let owner = Identity::new(owner_did, owner_org_name);
        let now = Utc::now();
        warn_unframeable(
            "createCircle",
            &[("id", id), ("name", name), ("ownerDID", owner_did), ("ownerOrgName", owner_org_name)],
        );

        self.execute("createCircle", |ledger| {
            let created = ledger.registry.decide_create(CreateCircle {
                circle_id: circle_id.clone(),
                name: name.to_string(),
                owner: owner.clone(),
                occurred_at: now,
            })?;
            let enrolled = ledger.membership.decide(
                &circle_id,
                &RosterCommand::Enroll(Enroll {
                    circle_id: circle_id.clone(),
                    member: owner.clone(),
                    via: JoinReason::Founder,
                    occurred_at: now,
                }),
            )?;
            Ok(vec![
                Change::Circle(circle_id.clone(), created),
                Change::Roster(circle_id.clone(), enrolled),
            ])
        })
    }

    /// Hand the circle to a new owner, enrolling them if they are not yet a
    /// member of an enabled circle.
    #[instrument(skip(self))]
    pub fn transfer_circle_ownership(
        &self,
        id: &str,
        caller_did: &str,
        new_owner_did: &str,
        new_owner_org_name: &str,
    ) -> DomainResult<Receipt> {
        let circle_id = CircleId::from(id);
        let new_owner = Identity::new(new_owner_did, new_owner_org_name);
        let now = Utc::now();
        warn_unframeable(
            "transferCircleOwnership",
            &[("ownerDID", new_owner_did), ("ownerOrgName", new_owner_org_name)],
        );

        self.execute("transferCircleOwnership", |ledger| {
            let circle = ledger.registry.require(&circle_id)?;
            let transferred = ledger.registry.decide(
                &circle_id,
                &CircleCommand::TransferOwnership(TransferOwnership {
                    circle_id: circle_id.clone(),
                    caller: Did::from(caller_did),
                    new_owner: new_owner.clone(),
                    occurred_at: now,
                }),
            )?;

            let mut changes = vec![Change::Circle(circle_id.clone(), transferred)];
            if !circle.is_disabled() {
                let enrolled = ledger.membership.decide(
                    &circle_id,
                    &RosterCommand::Enroll(Enroll {
                        circle_id: circle_id.clone(),
                        member: new_owner.clone(),
                        via: JoinReason::OwnershipTransfer,
                        occurred_at: now,
                    }),
                )?;
                changes.push(Change::Roster(circle_id.clone(), enrolled));
            }
            Ok(changes)
        })
    }

    /// All circles in creation order.
    pub fn get_all_circles(&self, page: usize, page_size: usize) -> Page<CircleRecord> {
        self.read(|ledger| {
            Page::collect(ledger.registry.iter(), PageRequest::new(page, page_size))
                .map(CircleRecord::from)
        })
    }

    pub fn get_circle_by_id(&self, id: &str) -> DomainResult<CircleRecord> {
        self.read(|ledger| {
            ledger
                .registry
                .require(&CircleId::from(id))
                .map(CircleRecord::from)
        })
    }

    // ----------------------------------------------------------------------
    // Membership workflow
    // ----------------------------------------------------------------------

    /// Submit (or re-submit) a pending application.
    #[instrument(skip(self, credit_proof))]
    pub fn apply_to_join_circle(
        &self,
        circle_id: &str,
        applicant_did: &str,
        applicant_org_name: &str,
        credit_proof: &str,
    ) -> DomainResult<Receipt> {
        let circle_id = CircleId::from(circle_id);
        let now = Utc::now();
        warn_unframeable(
            "applyToJoinCircle",
            &[
                ("applicantDID", applicant_did),
                ("applicantOrgName", applicant_org_name),
                ("creditProof", credit_proof),
            ],
        );

        self.execute("applyToJoinCircle", |ledger| {
            ledger.registry.require(&circle_id)?.ensure_accepting_members()?;
            let submitted = ledger.membership.decide(
                &circle_id,
                &RosterCommand::SubmitApplication(SubmitApplication {
                    circle_id: circle_id.clone(),
                    applicant: Identity::new(applicant_did, applicant_org_name),
                    credit_proof: credit_proof.to_string(),
                    occurred_at: now,
                }),
            )?;
            Ok(vec![Change::Roster(circle_id.clone(), submitted)])
        })
    }

    #[instrument(skip(self))]
    pub fn approve_application(
        &self,
        circle_id: &str,
        caller_did: &str,
        applicant_did: &str,
    ) -> DomainResult<Receipt> {
        let circle_id = CircleId::from(circle_id);
        let now = Utc::now();

        self.execute("approveApplication", |ledger| {
            ledger.registry.require(&circle_id)?.ensure_owner(&Did::from(caller_did))?;
            let approved = ledger.membership.decide(
                &circle_id,
                &RosterCommand::ApproveApplication(ApproveApplication {
                    circle_id: circle_id.clone(),
                    applicant: Did::from(applicant_did),
                    occurred_at: now,
                }),
            )?;
            Ok(vec![Change::Roster(circle_id.clone(), approved)])
        })
    }

    #[instrument(skip(self))]
    pub fn reject_application(
        &self,
        circle_id: &str,
        caller_did: &str,
        applicant_did: &str,
    ) -> DomainResult<Receipt> {
        let circle_id = CircleId::from(circle_id);
        let now = Utc::now();

        self.execute("rejectApplication", |ledger| {
            ledger.registry.require(&circle_id)?.ensure_owner(&Did::from(caller_did))?;
            let rejected = ledger.membership.decide(
                &circle_id,
                &RosterCommand::RejectApplication(RejectApplication {
                    circle_id: circle_id.clone(),
                    applicant: Did::from(applicant_did),
                    occurred_at: now,
                }),
            )?;
            Ok(vec![Change::Roster(circle_id.clone(), rejected)])
        })
    }

    /// Leave a circle. The last member leaving disables it for good.
    #[instrument(skip(self))]
    pub fn exit_circle(&self, circle_id: &str, member_did: &str) -> DomainResult<Receipt> {
        let circle_id = CircleId::from(circle_id);
        let now = Utc::now();

        self.execute("exitCircle", |ledger| {
            let circle = ledger.registry.require(&circle_id)?;
            let left = ledger.membership.decide(
                &circle_id,
                &RosterCommand::ExitCircle(ExitCircle {
                    circle_id: circle_id.clone(),
                    member: Did::from(member_did),
                    owner: circle.owner().did.clone(),
                    occurred_at: now,
                }),
            )?;

            let emptied = left
                .iter()
                .any(|e| matches!(e, RosterEvent::MemberLeft(l) if l.remaining_members == 0));

            let mut changes = vec![Change::Roster(circle_id.clone(), left)];
            if emptied {
                let disabled = ledger.registry.decide(
                    &circle_id,
                    &CircleCommand::DisableCircle(DisableCircle {
                        circle_id: circle_id.clone(),
                        occurred_at: now,
                    }),
                )?;
                changes.push(Change::Circle(circle_id.clone(), disabled));
            }
            Ok(changes)
        })
    }

    /// Applications of a circle in first-submission order, any status.
    pub fn get_applications(
        &self,
        circle_id: &str,
        page: usize,
        page_size: usize,
    ) -> Page<ApplicationRecord> {
        let circle_id = CircleId::from(circle_id);
        self.read(|ledger| {
            Page::collect(
                ledger
                    .membership
                    .roster(&circle_id)
                    .into_iter()
                    .flat_map(|roster| roster.applications()),
                PageRequest::new(page, page_size),
            )
            .map(ApplicationRecord::from)
        })
    }

    /// Members of a circle in join order.
    pub fn get_circle_members(
        &self,
        circle_id: &str,
        page: usize,
        page_size: usize,
    ) -> Page<MemberRecord> {
        let circle_id = CircleId::from(circle_id);
        self.read(|ledger| {
            Page::collect(
                ledger
                    .membership
                    .roster(&circle_id)
                    .into_iter()
                    .flat_map(|roster| roster.members()),
                PageRequest::new(page, page_size),
            )
            .map(MemberRecord::from)
        })
    }

    /// Administrative member listing. Same data and access as
    /// [`get_circle_members`](Self::get_circle_members).
    pub fn get_members_in_circle_for_admin(
        &self,
        circle_id: &str,
        page: usize,
        page_size: usize,
    ) -> Page<MemberRecord> {
        self.get_circle_members(circle_id, page, page_size)
    }

    // ----------------------------------------------------------------------
    // Product catalog
    // ----------------------------------------------------------------------

    /// List a new product, pending audit and off the shelf.
    #[instrument(skip(self, ipfs_hash))]
    pub fn create_product(
        &self,
        circle_id: &str,
        owner_did: &str,
        name: &str,
        price: &str,
        category: u8,
        ipfs_hash: &str,
    ) -> DomainResult<(ProductId, Receipt)> {
        let circle_id = CircleId::from(circle_id);
        let owner = Did::from(owner_did);
        let now = Utc::now();
        warn_unframeable(
            "createProduct",
            &[("ownerDID", owner_did), ("name", name), ("price", price), ("ipfsHash", ipfs_hash)],
        );

        self.execute_with("createProduct", |ledger| {
            ledger.registry.require(&circle_id)?;
            ledger
                .membership
                .roster(&circle_id)
                .ok_or(DomainError::NotMember)?
                .ensure_member(&owner)?;

            let product_id = ledger.catalog.next_id();
            let created = ledger.catalog.decide_create(CreateProduct {
                product_id,
                circle_id: circle_id.clone(),
                owner: owner.clone(),
                name: name.to_string(),
                price: price.to_string(),
                category,
                ipfs_hash: ipfs_hash.to_string(),
                occurred_at: now,
            })?;
            Ok((product_id, vec![Change::Product(product_id, created)]))
        })
    }

    #[instrument(skip(self))]
    pub fn approve_product(
        &self,
        circle_id: &str,
        caller_did: &str,
        product_id: ProductId,
    ) -> DomainResult<Receipt> {
        let circle_id = CircleId::from(circle_id);
        let now = Utc::now();

        self.execute("approveProduct", |ledger| {
            let circle = ledger.registry.require(&circle_id)?;
            let product = ledger.catalog.require(product_id)?;
            circle.ensure_owner(&Did::from(caller_did))?;

            let approved = product.handle(&ProductCommand::ApproveProduct(ApproveProduct {
                product_id,
                circle_id: circle_id.clone(),
                occurred_at: now,
            }))?;
            Ok(vec![Change::Product(product_id, approved)])
        })
    }

    /// Replace name, price and content pointer; the audit starts over.
    #[instrument(skip(self, new_ipfs_hash))]
    pub fn edit_product(
        &self,
        product_id: ProductId,
        caller_did: &str,
        new_name: &str,
        new_price: &str,
        new_ipfs_hash: &str,
    ) -> DomainResult<Receipt> {
        let now = Utc::now();
        warn_unframeable(
            "editProduct",
            &[("name", new_name), ("price", new_price), ("ipfsHash", new_ipfs_hash)],
        );
        let unshelve = self.config.unshelve_on_edit;

        self.execute("editProduct", |ledger| {
            let edited = ledger.catalog.decide(
                product_id,
                &ProductCommand::EditProduct(EditProduct {
                    product_id,
                    caller: Did::from(caller_did),
                    name: new_name.to_string(),
                    price: new_price.to_string(),
                    ipfs_hash: new_ipfs_hash.to_string(),
                    unshelve,
                    occurred_at: now,
                }),
            )?;
            Ok(vec![Change::Product(product_id, edited)])
        })
    }

    #[instrument(skip(self))]
    pub fn set_product_on_shelf(
        &self,
        product_id: ProductId,
        caller_did: &str,
        on_shelf: bool,
    ) -> DomainResult<Receipt> {
        let now = Utc::now();
        let require_approval = self.config.shelf_requires_approval;

        self.execute("setProductOnShelf", |ledger| {
            let changed = ledger.catalog.decide(
                product_id,
                &ProductCommand::SetShelf(SetShelf {
                    product_id,
                    caller: Did::from(caller_did),
                    on_shelf,
                    require_approval,
                    occurred_at: now,
                }),
            )?;
            Ok(vec![Change::Product(product_id, changed)])
        })
    }

    /// Products across every circle, in creation order.
    pub fn get_all_products(&self, page: usize, page_size: usize) -> Page<ProductRecord> {
        self.read(|ledger| {
            Page::collect(ledger.catalog.iter(), PageRequest::new(page, page_size))
                .map(ProductRecord::from)
        })
    }

    /// Products of one circle, in creation order.
    pub fn get_circle_products(
        &self,
        circle_id: &str,
        page: usize,
        page_size: usize,
    ) -> Page<ProductRecord> {
        let circle_id = CircleId::from(circle_id);
        self.read(|ledger| {
            Page::collect(
                ledger.catalog.in_circle(&circle_id),
                PageRequest::new(page, page_size),
            )
            .map(ProductRecord::from)
        })
    }

    pub fn get_product_by_id(&self, product_id: ProductId) -> DomainResult<ProductRecord> {
        self.read(|ledger| ledger.catalog.require(product_id).map(ProductRecord::from))
    }

    // ----------------------------------------------------------------------
    // Execution
    // ----------------------------------------------------------------------

    fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let ledger = self.ledger.read().unwrap_or_else(PoisonError::into_inner);
        f(&ledger)
    }

    fn execute(
        &self,
        operation: &'static str,
        decide: impl FnOnce(&Ledger) -> DomainResult<Vec<Change>>,
    ) -> DomainResult<Receipt> {
        self.execute_with(operation, |ledger| decide(ledger).map(|changes| ((), changes)))
            .map(|((), receipt)| receipt)
    }

    fn execute_with<T>(
        &self,
        operation: &'static str,
        decide: impl FnOnce(&Ledger) -> DomainResult<(T, Vec<Change>)>,
    ) -> DomainResult<(T, Receipt)> {
        // Poisoning cannot leave a half-applied write: state only changes in
        // `commit`, after every decision succeeded.
        let mut ledger = self.ledger.write().unwrap_or_else(PoisonError::into_inner);

        let (value, changes) = match decide(&ledger) {
            Ok(decided) => decided,
            Err(err) => {
                debug!(operation, error = %err, "operation rejected");
                return Err(err);
            }
        };

        let envelopes = ledger.commit(changes);
        for envelope in &envelopes {
            if let Err(err) = self.bus.publish(envelope.clone()) {
                warn!(
                    operation,
                    sequence = envelope.sequence_number(),
                    error = ?err,
                    "notification publish failed"
                );
            }
        }

        info!(
            operation,
            events = ?envelopes.iter().map(|e| e.payload().name()).collect::<Vec<_>>(),
            "operation committed"
        );
        Ok((value, Receipt::new(envelopes)))
    }
}

/// Listing values are written verbatim, so `;` or `|` inside one splits the
/// record when it is decoded. Returns the offending field names.
fn warn_unframeable(operation: &'static str, values: &[(&'static str, &str)]) -> Vec<&'static str> {
    let fields: Vec<&'static str> = values
        .iter()
        .filter(|(_, value)| !is_wire_safe(value))
        .map(|(field, _)| *field)
        .collect();
    for field in &fields {
        warn!(operation, field, "value contains a listing separator");
    }
    fields
}
