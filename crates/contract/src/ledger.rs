//! All contract state, and the commit step that turns decided events into
//! applied state plus sequenced notifications.

use uuid::Uuid;

use circles_catalog::{ProductCatalog, ProductEvent};
use circles_core::{CircleId, ProductId};
use circles_events::EventEnvelope;
use circles_membership::{MembershipBook, RosterEvent};
use circles_registry::{CircleEvent, CircleRegistry};

use crate::notification::Notification;

/// Events decided for one aggregate, waiting to be applied.
#[derive(Debug, Clone)]
pub(crate) enum Change {
    Circle(CircleId, Vec<CircleEvent>),
    Roster(CircleId, Vec<RosterEvent>),
    Product(ProductId, Vec<ProductEvent>),
}

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    pub(crate) registry: CircleRegistry,
    pub(crate) membership: MembershipBook,
    pub(crate) catalog: ProductCatalog,
    sequence: u64,
}

impl Ledger {
    /// Apply every change in order. Infallible: all checks already passed.
    pub(crate) fn commit(&mut self, changes: Vec<Change>) -> Vec<EventEnvelope<Notification>> {
        let mut committed = Vec::new();
        for change in changes {
            match change {
                Change::Circle(id, events) => {
                    self.registry.commit(&id, &events);
                    for event in events {
                        let envelope =
                            self.envelope(id.as_str(), "registry.circle", Notification::Registry(event));
                        committed.push(envelope);
                    }
                }
                Change::Roster(id, events) => {
                    self.membership.commit(&id, &events);
                    for event in events {
                        let envelope = self.envelope(
                            id.as_str(),
                            "membership.roster",
                            Notification::Membership(event),
                        );
                        committed.push(envelope);
                    }
                }
                Change::Product(id, events) => {
                    self.catalog.commit(id, &events);
                    for event in events {
                        let envelope =
                            self.envelope(&id.to_string(), "catalog.product", Notification::Catalog(event));
                        committed.push(envelope);
                    }
                }
            }
        }
        committed
    }

    fn envelope(
        &mut self,
        stream: &str,
        stream_type: &str,
        payload: Notification,
    ) -> EventEnvelope<Notification> {
        self.sequence += 1;
        EventEnvelope::new(Uuid::now_v7(), stream, stream_type, self.sequence, payload)
    }
}
