//! Owner of every circle record, in creation order.

use indexmap::IndexMap;

use circles_core::{Aggregate, CircleId, DomainError, DomainResult, Missing};

use crate::circle::{Circle, CircleCommand, CircleEvent, CreateCircle};

#[derive(Debug, Default, Clone)]
pub struct CircleRegistry {
    circles: IndexMap<CircleId, Circle>,
}

impl CircleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &CircleId) -> Option<&Circle> {
        self.circles.get(id)
    }

    pub fn require(&self, id: &CircleId) -> DomainResult<&Circle> {
        self.get(id).ok_or(DomainError::not_found(Missing::Circle))
    }

    pub fn contains(&self, id: &CircleId) -> bool {
        self.circles.contains_key(id)
    }

    /// Decide a creation against the whole registry (ids are globally unique).
    pub fn decide_create(&self, cmd: CreateCircle) -> DomainResult<Vec<CircleEvent>> {
        if self.contains(&cmd.circle_id) {
            return Err(DomainError::duplicate_id(cmd.circle_id.as_str()));
        }
        Circle::empty(cmd.circle_id.clone()).handle(&CircleCommand::CreateCircle(cmd))
    }

    /// Decide a command against an existing circle.
    pub fn decide(&self, id: &CircleId, cmd: &CircleCommand) -> DomainResult<Vec<CircleEvent>> {
        self.require(id)?.handle(cmd)
    }

    /// Apply events that were already decided; inserts the circle on creation.
    pub fn commit(&mut self, id: &CircleId, events: &[CircleEvent]) {
        if events.is_empty() {
            return;
        }
        self.circles
            .entry(id.clone())
            .or_insert_with(|| Circle::empty(id.clone()))
            .apply_all(events);
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Circle> {
        self.circles.values()
    }

    pub fn len(&self) -> usize {
        self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }
}
