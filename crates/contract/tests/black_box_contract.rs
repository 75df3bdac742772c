use std::sync::Arc;
use std::thread;

use circles_codec::decode_records;
use circles_contract::{
    CircleContract, ContractConfig, DefaultBus, DomainError, ErrorKind, Missing, Notification,
    ProductId,
};
use circles_events::EventBus;
use circles_membership::RosterEvent;

const ADMIN_DID: &str = "did:admin";
const USER1_DID: &str = "did:user1";
const USER2_DID: &str = "did:user2";
const ADMIN_ORG: &str = "admin-org";
const USER1_ORG: &str = "user1-org";
const CIRCLE_NAME: &str = "first circle";
const CIRCLE_ID: &str = "test-circle";

fn deploy() -> CircleContract {
    CircleContract::new(ContractConfig::default())
}

/// Circle with the admin as owner and user1 as an approved member.
fn deploy_with_member() -> CircleContract {
    let contract = deploy();
    contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .expect("create circle");
    contract
        .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "credit-123")
        .expect("apply");
    contract
        .approve_application(CIRCLE_ID, ADMIN_DID, USER1_DID)
        .expect("approve");
    contract
}

/// Reads the `id` of the first product from the wire listing, as an external
/// caller would.
fn first_product_id(contract: &CircleContract) -> ProductId {
    let products = decode_records(&contract.get_all_products(1, 10).encode());
    products[0]
        .get("id")
        .expect("id field")
        .parse()
        .expect("decimal product id")
}

#[test]
fn create_circle_lists_it_and_emits_created() {
    let contract = deploy();
    let receipt = contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .unwrap();
    assert!(receipt.emitted("CircleCreated"));

    let circles = decode_records(&contract.get_all_circles(1, 10).encode());
    assert_eq!(circles.len(), 1);
    assert_eq!(circles[0].get("id"), Some(CIRCLE_ID));
    assert_eq!(circles[0].get("ownerDID"), Some(ADMIN_DID));
    assert_eq!(circles[0].get("disabled"), Some("0"));
}

#[test]
fn transfer_ownership_updates_owner_fields() {
    let contract = deploy();
    contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .unwrap();

    let receipt = contract
        .transfer_circle_ownership(CIRCLE_ID, ADMIN_DID, "did:new-owner", "new-owner-org")
        .unwrap();
    assert!(receipt.emitted("OwnershipTransferred"));

    let circles = decode_records(&contract.get_all_circles(1, 10).encode());
    assert_eq!(circles[0].get("ownerDID"), Some("did:new-owner"));
    assert_eq!(circles[0].get("ownerOrgName"), Some("new-owner-org"));
}

#[test]
fn apply_then_approve_adds_member() {
    let contract = deploy();
    contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .unwrap();
    contract
        .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "credit-123")
        .unwrap();

    let applications = decode_records(&contract.get_applications(CIRCLE_ID, 1, 10).encode());
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].get("applicantDID"), Some(USER1_DID));
    assert_eq!(applications[0].get("status"), Some("0"));

    let receipt = contract
        .approve_application(CIRCLE_ID, ADMIN_DID, USER1_DID)
        .unwrap();
    assert_eq!(receipt.names(), vec!["ApplicationApproved", "MemberJoined"]);

    let members = decode_records(&contract.get_circle_members(CIRCLE_ID, 1, 10).encode());
    assert_eq!(members.len(), 2);
    assert!(members.iter().any(|m| m.get("did") == Some(USER1_DID)));
}

#[test]
fn rejected_application_reports_status_two() {
    let contract = deploy();
    contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .unwrap();
    contract
        .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "credit-123")
        .unwrap();

    let receipt = contract
        .reject_application(CIRCLE_ID, ADMIN_DID, USER1_DID)
        .unwrap();
    assert!(receipt.emitted("ApplicationRejected"));

    let applications = decode_records(&contract.get_applications(CIRCLE_ID, 1, 10).encode());
    assert_eq!(applications[0].get("status"), Some("2"));
    assert_eq!(contract.get_circle_members(CIRCLE_ID, 1, 10).total, 1);
}

#[test]
fn reapplying_after_rejection_overwrites_in_place() {
    let contract = deploy();
    contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .unwrap();
    contract
        .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "first-proof")
        .unwrap();
    contract
        .apply_to_join_circle(CIRCLE_ID, USER2_DID, "user2-org", "p")
        .unwrap();
    contract
        .reject_application(CIRCLE_ID, ADMIN_DID, USER1_DID)
        .unwrap();
    contract
        .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "second-proof")
        .unwrap();

    let applications = contract.get_applications(CIRCLE_ID, 1, 10);
    assert_eq!(applications.total, 2);
    assert_eq!(applications.items[0].applicant_did, USER1_DID);
    assert_eq!(applications.items[0].credit_proof, "second-proof");
    assert_eq!(applications.items[0].status, 0);
}

#[test]
fn member_exit_removes_member() {
    let contract = deploy_with_member();

    let receipt = contract.exit_circle(CIRCLE_ID, USER1_DID).unwrap();
    assert!(receipt.emitted("MemberLeft"));
    assert!(!receipt.emitted("CircleDisabled"));

    let members = decode_records(&contract.get_circle_members(CIRCLE_ID, 1, 10).encode());
    assert_eq!(members.len(), 1);
    assert!(!members.iter().any(|m| m.get("did") == Some(USER1_DID)));
}

#[test]
fn admin_view_matches_member_listing() {
    let contract = deploy_with_member();

    let admin = contract.get_members_in_circle_for_admin(CIRCLE_ID, 1, 10);
    assert_eq!(admin.len(), 2);
    assert_eq!(admin, contract.get_circle_members(CIRCLE_ID, 1, 10));
    assert!(admin.items.iter().any(|m| m.did == USER1_DID));
}

#[test]
fn member_pages_report_totals() {
    let contract = deploy_with_member();

    let page = contract.get_circle_members(CIRCLE_ID, 1, 10);
    assert_eq!(page.len(), 2);
    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 1);

    let second = contract.get_circle_members(CIRCLE_ID, 2, 1);
    assert_eq!(second.len(), 1);
    assert_eq!(second.items[0].did, USER1_DID);
    assert_eq!(second.total_pages, 2);

    assert_eq!(contract.get_circle_members(CIRCLE_ID, 3, 1).encode(), "");
    assert!(contract.get_circle_members(CIRCLE_ID, 0, 10).is_empty());
}

#[test]
fn owner_cannot_exit_while_others_remain() {
    let contract = deploy_with_member();

    let err = contract.exit_circle(CIRCLE_ID, ADMIN_DID).unwrap_err();
    assert_eq!(err, DomainError::OwnerMustTransferFirst);
    assert!(
        err.to_string()
            .contains("Owner must transfer ownership before exit if there are other members")
    );
    assert_eq!(contract.get_circle_members(CIRCLE_ID, 1, 10).total, 2);
}

#[test]
fn last_owner_exit_disables_circle_and_blocks_joins() {
    let contract = deploy();
    contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .unwrap();

    let receipt = contract.exit_circle(CIRCLE_ID, ADMIN_DID).unwrap();
    assert_eq!(receipt.names(), vec!["MemberLeft", "CircleDisabled"]);

    let circles = decode_records(&contract.get_all_circles(1, 10).encode());
    assert_eq!(circles[0].get("disabled"), Some("1"));

    let err = contract
        .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "credit-123")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircleDisabled);
    assert!(err.to_string().contains("Circle is disabled, cannot join"));
    assert!(contract.get_applications(CIRCLE_ID, 1, 10).is_empty());
}

#[test]
fn owner_exits_after_handing_over_and_last_owner_disables() {
    let contract = deploy_with_member();
    assert_eq!(
        contract.exit_circle(CIRCLE_ID, ADMIN_DID).unwrap_err(),
        DomainError::OwnerMustTransferFirst
    );

    contract
        .transfer_circle_ownership(CIRCLE_ID, ADMIN_DID, USER1_DID, USER1_ORG)
        .unwrap();

    let receipt = contract.exit_circle(CIRCLE_ID, ADMIN_DID).unwrap();
    assert_eq!(receipt.names(), vec!["MemberLeft"]);
    let circles = decode_records(&contract.get_all_circles(1, 10).encode());
    assert_eq!(circles[0].get("disabled"), Some("0"));

    let receipt = contract.exit_circle(CIRCLE_ID, USER1_DID).unwrap();
    assert_eq!(receipt.names(), vec!["MemberLeft", "CircleDisabled"]);

    let circles = decode_records(&contract.get_all_circles(1, 10).encode());
    assert_eq!(circles[0].get("ownerDID"), Some(USER1_DID));
    assert_eq!(circles[0].get("disabled"), Some("1"));
    assert!(contract.get_circle_members(CIRCLE_ID, 1, 10).is_empty());
}

#[test]
fn transfer_to_pending_applicant_resolves_their_application() {
    let contract = deploy();
    contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .unwrap();
    contract
        .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "credit-123")
        .unwrap();

    let receipt = contract
        .transfer_circle_ownership(CIRCLE_ID, ADMIN_DID, USER1_DID, USER1_ORG)
        .unwrap();
    assert_eq!(
        receipt.names(),
        vec!["OwnershipTransferred", "ApplicationApproved", "MemberJoined"]
    );

    let applications = decode_records(&contract.get_applications(CIRCLE_ID, 1, 10).encode());
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].get("status"), Some("1"));

    // Nothing is left pending for the new owner to act on.
    assert_eq!(
        contract
            .approve_application(CIRCLE_ID, USER1_DID, USER1_DID)
            .unwrap_err(),
        DomainError::not_found(Missing::Application)
    );
    assert_eq!(contract.get_circle_members(CIRCLE_ID, 1, 10).total, 2);
}

#[test]
fn member_publishes_product_and_owner_approves_it() {
    let contract = deploy_with_member();

    let (id, receipt) = contract
        .create_product(CIRCLE_ID, USER1_DID, "test product", "100 ETH", 0, "ipfs-hash")
        .unwrap();
    assert!(receipt.emitted("ProductCreated"));
    assert_eq!(id, ProductId::new(1));

    let products = decode_records(&contract.get_all_products(1, 10).encode());
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].get("auditStatus"), Some("0"));
    assert_eq!(products[0].get("onShelf"), Some("0"));

    let product_id = first_product_id(&contract);
    contract
        .approve_product(CIRCLE_ID, ADMIN_DID, product_id)
        .unwrap();

    let products = decode_records(&contract.get_all_products(1, 10).encode());
    assert_eq!(products[0].get("auditStatus"), Some("1"));
}

#[test]
fn product_owner_edits_and_shelves() {
    let contract = deploy_with_member();
    contract
        .create_product(CIRCLE_ID, USER1_DID, "old product", "99", 0, "old-ipfs")
        .unwrap();
    let product_id = first_product_id(&contract);
    contract
        .approve_product(CIRCLE_ID, ADMIN_DID, product_id)
        .unwrap();

    contract
        .edit_product(product_id, USER1_DID, "new product", "199", "new-ipfs")
        .unwrap();
    let products = decode_records(&contract.get_all_products(1, 10).encode());
    assert_eq!(products[0].get("name"), Some("new product"));
    assert_eq!(products[0].get("price"), Some("199"));
    assert_eq!(products[0].get("auditStatus"), Some("0"));

    let err = contract
        .set_product_on_shelf(product_id, USER1_DID, true)
        .unwrap_err();
    assert_eq!(err, DomainError::ProductNotApproved);

    contract
        .approve_product(CIRCLE_ID, ADMIN_DID, product_id)
        .unwrap();
    let receipt = contract
        .set_product_on_shelf(product_id, USER1_DID, true)
        .unwrap();
    assert!(receipt.emitted("ProductShelfChanged"));

    let products = decode_records(&contract.get_all_products(1, 10).encode());
    assert_eq!(products[0].get("onShelf"), Some("1"));

    // Editing a shelved product takes it back off the shelf.
    contract
        .edit_product(product_id, USER1_DID, "newer product", "299", "newer-ipfs")
        .unwrap();
    let detail = contract.get_product_by_id(product_id).unwrap();
    assert!(!detail.on_shelf);
    assert_eq!(detail.audit_status, 0);
}

#[test]
fn only_the_product_owner_may_edit_or_shelve() {
    let contract = deploy_with_member();
    let (id, _) = contract
        .create_product(CIRCLE_ID, USER1_DID, "A", "1", 0, "ipfs-A")
        .unwrap();

    assert_eq!(
        contract
            .edit_product(id, ADMIN_DID, "B", "2", "ipfs-B")
            .unwrap_err(),
        DomainError::NotProductOwner
    );
    assert_eq!(
        contract.set_product_on_shelf(id, ADMIN_DID, false).unwrap_err(),
        DomainError::NotProductOwner
    );
    assert_eq!(contract.get_product_by_id(id).unwrap().name, "A");
}

#[test]
fn anyone_can_list_every_product() {
    let contract = deploy_with_member();
    contract
        .create_circle("other-circle", "second", USER2_DID, "user2-org")
        .unwrap();
    contract
        .create_product(CIRCLE_ID, USER1_DID, "A", "1", 0, "ipfs-A")
        .unwrap();
    contract
        .create_product(CIRCLE_ID, USER1_DID, "B", "2", 1, "ipfs-B")
        .unwrap();
    contract
        .create_product("other-circle", USER2_DID, "C", "3", 2, "ipfs-C")
        .unwrap();

    let all = decode_records(&contract.get_all_products(1, 10).encode());
    assert_eq!(all.len(), 3);
    let ids: Vec<_> = all.iter().filter_map(|p| p.get("id")).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    let in_circle = contract.get_circle_products(CIRCLE_ID, 1, 10);
    assert_eq!(in_circle.total, 2);
    assert!(in_circle.items.iter().all(|p| p.circle_id == CIRCLE_ID));
}

#[test]
fn product_detail_by_id() {
    let contract = deploy_with_member();
    contract
        .create_product(CIRCLE_ID, USER1_DID, "product C", "10", 0, "ipfs-C")
        .unwrap();
    let product_id = first_product_id(&contract);

    let detail = contract.get_product_by_id(product_id).unwrap();
    assert_eq!(detail.name, "product C");
    assert_eq!(detail.price, "10");
    assert_eq!(detail.ipfs_hash, "ipfs-C");
    assert_eq!(detail.owner_did, USER1_DID);

    assert_eq!(
        contract.get_product_by_id(ProductId::new(42)).unwrap_err(),
        DomainError::not_found(Missing::Product)
    );
}

#[test]
fn subscribers_see_notifications_in_commit_order() {
    let contract = deploy();
    let subscription = contract.bus().subscribe();

    contract
        .create_circle(CIRCLE_ID, CIRCLE_NAME, ADMIN_DID, ADMIN_ORG)
        .unwrap();
    contract
        .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "credit-123")
        .unwrap();
    contract
        .approve_application(CIRCLE_ID, ADMIN_DID, USER1_DID)
        .unwrap();
    contract.exit_circle(CIRCLE_ID, USER1_DID).unwrap();

    let delivered = subscription.drain();
    let names: Vec<&str> = delivered.iter().map(|e| e.payload().name()).collect();
    assert_eq!(
        names,
        vec![
            "CircleCreated",
            "MemberJoined",
            "ApplicationSubmitted",
            "ApplicationApproved",
            "MemberJoined",
            "MemberLeft",
        ]
    );

    let sequence: Vec<u64> = delivered.iter().map(|e| e.sequence_number()).collect();
    assert_eq!(sequence, (1..=6).collect::<Vec<_>>());

    match delivered[5].payload() {
        Notification::Membership(RosterEvent::MemberLeft(left)) => {
            assert_eq!(left.member.as_str(), USER1_DID);
            assert_eq!(left.remaining_members, 1);
        }
        other => panic!("unexpected notification: {other:?}"),
    }
}

#[test]
fn failed_operations_leave_no_trace() {
    let contract = deploy_with_member();
    let subscription = contract.bus().subscribe();
    let before_circles = contract.get_all_circles(1, 10).encode();
    let before_members = contract.get_circle_members(CIRCLE_ID, 1, 10).encode();

    let failures = [
        contract.create_circle(CIRCLE_ID, "dup", USER2_DID, "x").unwrap_err(),
        contract
            .transfer_circle_ownership(CIRCLE_ID, USER1_DID, USER2_DID, "x")
            .unwrap_err(),
        contract
            .apply_to_join_circle(CIRCLE_ID, USER1_DID, USER1_ORG, "again")
            .unwrap_err(),
        contract
            .approve_application(CIRCLE_ID, ADMIN_DID, USER2_DID)
            .unwrap_err(),
        contract.exit_circle(CIRCLE_ID, USER2_DID).unwrap_err(),
        contract
            .create_product(CIRCLE_ID, USER2_DID, "A", "1", 0, "ipfs")
            .unwrap_err(),
    ];
    let kinds: Vec<ErrorKind> = failures.iter().map(DomainError::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::DuplicateId,
            ErrorKind::NotOwner,
            ErrorKind::AlreadyMember,
            ErrorKind::NotFound,
            ErrorKind::NotMember,
            ErrorKind::NotMember,
        ]
    );

    assert!(subscription.drain().is_empty());
    assert_eq!(contract.get_all_circles(1, 10).encode(), before_circles);
    assert_eq!(
        contract.get_circle_members(CIRCLE_ID, 1, 10).encode(),
        before_members
    );
    assert!(contract.get_all_products(1, 10).is_empty());

    // A rejected creation does not burn a product id.
    let (id, _) = contract
        .create_product(CIRCLE_ID, USER1_DID, "A", "1", 0, "ipfs")
        .unwrap();
    assert_eq!(id, ProductId::new(1));
}

#[test]
fn concurrent_writers_are_serialized() {
    let bus = Arc::new(DefaultBus::new());
    let subscription = bus.subscribe();
    let contract = Arc::new(CircleContract::with_bus(
        ContractConfig::default(),
        Arc::clone(&bus),
    ));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let contract = Arc::clone(&contract);
            thread::spawn(move || {
                let id = format!("circle-{n}");
                contract
                    .create_circle(&id, "name", &format!("did:owner-{n}"), "org")
                    .expect("create");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread");
    }

    assert_eq!(contract.get_all_circles(1, 100).total, 8);

    let sequence: Vec<u64> = subscription
        .drain()
        .iter()
        .map(|e| e.sequence_number())
        .collect();
    assert_eq!(sequence, (1..=16).collect::<Vec<_>>());
}
