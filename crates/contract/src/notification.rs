//! Notifications emitted by successful writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use circles_catalog::ProductEvent;
use circles_events::{Event, EventEnvelope};
use circles_membership::RosterEvent;
use circles_registry::CircleEvent;

/// Any event the contract commits, tagged by the module that decided it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "module", content = "event", rename_all = "lowercase")]
pub enum Notification {
    Registry(CircleEvent),
    Membership(RosterEvent),
    Catalog(ProductEvent),
}

impl Notification {
    /// Contract-level event name, e.g. `"CircleCreated"` or `"MemberLeft"`.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Registry(e) => match e {
                CircleEvent::CircleCreated(_) => "CircleCreated",
                CircleEvent::OwnershipTransferred(_) => "OwnershipTransferred",
                CircleEvent::CircleDisabled(_) => "CircleDisabled",
            },
            Notification::Membership(e) => match e {
                RosterEvent::ApplicationSubmitted(_) => "ApplicationSubmitted",
                RosterEvent::ApplicationApproved(_) => "ApplicationApproved",
                RosterEvent::ApplicationRejected(_) => "ApplicationRejected",
                RosterEvent::MemberJoined(_) => "MemberJoined",
                RosterEvent::MemberLeft(_) => "MemberLeft",
            },
            Notification::Catalog(e) => match e {
                ProductEvent::ProductCreated(_) => "ProductCreated",
                ProductEvent::ProductApproved(_) => "ProductApproved",
                ProductEvent::ProductEdited(_) => "ProductEdited",
                ProductEvent::ProductShelfChanged(_) => "ProductShelfChanged",
            },
        }
    }
}

impl Event for Notification {
    fn event_type(&self) -> &'static str {
        match self {
            Notification::Registry(e) => e.event_type(),
            Notification::Membership(e) => e.event_type(),
            Notification::Catalog(e) => e.event_type(),
        }
    }

    fn version(&self) -> u32 {
        match self {
            Notification::Registry(e) => e.version(),
            Notification::Membership(e) => e.version(),
            Notification::Catalog(e) => e.version(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Notification::Registry(e) => e.occurred_at(),
            Notification::Membership(e) => e.occurred_at(),
            Notification::Catalog(e) => e.occurred_at(),
        }
    }
}

/// What a successful write committed, in commit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    events: Vec<EventEnvelope<Notification>>,
}

impl Receipt {
    pub fn new(events: Vec<EventEnvelope<Notification>>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[EventEnvelope<Notification>] {
        &self.events
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.payload().name()).collect()
    }

    /// Whether the write emitted a notification with this contract name.
    pub fn emitted(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.payload().name() == name)
    }

    /// First emitted notification with this name.
    pub fn find(&self, name: &str) -> Option<&Notification> {
        self.events
            .iter()
            .map(EventEnvelope::payload)
            .find(|n| n.name() == name)
    }

    pub fn into_events(self) -> Vec<EventEnvelope<Notification>> {
        self.events
    }
}
