//! Transaction semantics across nested tracked graphs.
//!
//! Accept commits the current state as the new baseline; reject restores
//! the baseline. Both are depth-first over complex children and
//! collections, and both are idempotent.

use retrace::{ChangeStatus, Track, Transact, trackable};

trackable! {
    pub struct Address {
        scalar city: String,
        scalar zip: String,
    }
}

trackable! {
    pub struct OrderDetail {
        scalar sku: String,
        scalar quantity: u64,
    }
}

trackable! {
    pub struct Customer {
        scalar name: String,
        complex address: Address,
        collection orders: OrderDetail,
    }
}

fn customer() -> Customer {
    Customer {
        name: "Ada".into(),
        address: Some(Address {
            city: "London".into(),
            zip: "N1".into(),
        }),
        orders: vec![
            OrderDetail {
                sku: "A-1".into(),
                quantity: 1,
            },
            OrderDetail {
                sku: "A-2".into(),
                quantity: 2,
            },
        ],
    }
}

#[test]
fn accept_commits_the_whole_graph() {
    let tracked = customer().into_tracked().unwrap();
    tracked.set("name", "Grace").unwrap();
    let address = tracked.complex::<Address>("address").unwrap().unwrap();
    address.set("city", "Oxford").unwrap();
    let orders = tracked.collection::<OrderDetail>("orders").unwrap();
    orders.push(OrderDetail {
        sku: "A-3".into(),
        quantity: 3,
    });
    orders.remove_at(0);

    assert_eq!(tracked.status(), ChangeStatus::Changed);
    tracked.accept_changes();

    assert_eq!(tracked.status(), ChangeStatus::Unchanged);
    assert_eq!(address.status(), ChangeStatus::Unchanged);
    assert!(!orders.is_changed());
    assert_eq!(orders.len(), 2);
    assert!(orders.deleted_items().is_empty());

    // the accepted state is the new baseline for original values
    assert_eq!(tracked.original_value("name").unwrap(), "Grace");
    let original = tracked.original().unwrap();
    assert_eq!(original.name, "Grace");
    assert_eq!(original.address.unwrap().city, "Oxford");
    assert_eq!(original.orders.len(), 2);
}

#[test]
fn reject_restores_the_whole_graph() {
    let tracked = customer().into_tracked().unwrap();
    let address = tracked.complex::<Address>("address").unwrap().unwrap();
    let orders = tracked.collection::<OrderDetail>("orders").unwrap();

    tracked.set("name", "Grace").unwrap();
    address.set("city", "Oxford").unwrap();
    orders.get(0).unwrap().set("quantity", 99u64).unwrap();
    orders.remove_at(1);
    orders.push(OrderDetail {
        sku: "scratch".into(),
        quantity: 0,
    });

    tracked.reject_changes();

    assert_eq!(tracked.status(), ChangeStatus::Unchanged);
    assert_eq!(tracked.to_record().unwrap(), customer());
}

#[test]
fn reject_after_accept_restores_the_accepted_state() {
    let tracked = customer().into_tracked().unwrap();
    tracked.set("name", "Grace").unwrap();
    tracked.accept_changes();

    tracked.set("name", "scratch").unwrap();
    let orders = tracked.collection::<OrderDetail>("orders").unwrap();
    orders.remove_at(0);
    tracked.reject_changes();

    assert_eq!(tracked.get("name").unwrap(), "Grace");
    assert_eq!(orders.len(), 2);
    assert_eq!(tracked.status(), ChangeStatus::Unchanged);
}

#[test]
fn accept_is_idempotent() {
    let tracked = customer().into_tracked().unwrap();
    tracked.set("name", "Grace").unwrap();
    tracked.accept_changes();
    let once = tracked.to_record().unwrap();
    tracked.accept_changes();
    assert_eq!(tracked.to_record().unwrap(), once);
    assert_eq!(tracked.status(), ChangeStatus::Unchanged);
}

#[test]
fn reject_is_idempotent() {
    let tracked = customer().into_tracked().unwrap();
    tracked.set("name", "Grace").unwrap();
    let orders = tracked.collection::<OrderDetail>("orders").unwrap();
    orders.remove_at(0);
    tracked.reject_changes();
    let once = tracked.to_record().unwrap();
    tracked.reject_changes();
    assert_eq!(tracked.to_record().unwrap(), once);
    assert_eq!(once, customer());
}

#[test]
fn reject_unwinds_children_before_the_parent_reports_unchanged() {
    let tracked = customer().into_tracked().unwrap();
    let address = tracked.complex::<Address>("address").unwrap().unwrap();
    address.set("city", "Oxford").unwrap();
    address.set("zip", "OX1").unwrap();

    assert_eq!(tracked.status(), ChangeStatus::Changed);
    tracked.reject_changes();

    assert_eq!(address.get("city").unwrap(), "London");
    assert_eq!(address.get("zip").unwrap(), "N1");
    assert_eq!(address.status(), ChangeStatus::Unchanged);
    assert_eq!(tracked.status(), ChangeStatus::Unchanged);
}

#[test]
fn accept_purges_deletions_permanently() {
    let tracked = customer().into_tracked().unwrap();
    let orders = tracked.collection::<OrderDetail>("orders").unwrap();
    let removed = orders.get(0).unwrap();
    orders.remove(&removed);
    tracked.accept_changes();

    // the purged item is a standalone wrapper again; rejecting the root
    // does not resurrect it
    assert_eq!(removed.status(), ChangeStatus::Unchanged);
    tracked.reject_changes();
    assert_eq!(orders.len(), 1);
}

#[test]
fn child_transactions_are_scoped_to_their_subtree() {
    let tracked = customer().into_tracked().unwrap();
    let address = tracked.complex::<Address>("address").unwrap().unwrap();
    let orders = tracked.collection::<OrderDetail>("orders").unwrap();

    tracked.set("name", "Grace").unwrap();
    address.set("city", "Oxford").unwrap();
    orders.remove_at(0);

    // rejecting only the nested collection leaves the rest dirty
    orders.reject_changes();
    assert_eq!(orders.len(), 2);
    assert!(!orders.is_changed());
    assert_eq!(address.status(), ChangeStatus::Changed);
    assert_eq!(tracked.status(), ChangeStatus::Changed);

    // rejecting only the complex child narrows it further
    address.reject_changes();
    assert_eq!(tracked.status(), ChangeStatus::Changed);
    assert_eq!(tracked.original_value("name").unwrap(), "Ada");

    tracked.reject_changes();
    assert_eq!(tracked.status(), ChangeStatus::Unchanged);
}
