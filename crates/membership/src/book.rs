//! Owner of every circle's roster.

use indexmap::IndexMap;

use circles_core::{Aggregate, CircleId, DomainResult};

use crate::roster::{CircleRoster, RosterCommand, RosterEvent};

#[derive(Debug, Default, Clone)]
pub struct MembershipBook {
    rosters: IndexMap<CircleId, CircleRoster>,
}

impl MembershipBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roster(&self, circle_id: &CircleId) -> Option<&CircleRoster> {
        self.rosters.get(circle_id)
    }

    /// Decide a command against a circle's roster; a circle that has never
    /// had a member is decided against an empty roster.
    pub fn decide(&self, circle_id: &CircleId, cmd: &RosterCommand) -> DomainResult<Vec<RosterEvent>> {
        match self.rosters.get(circle_id) {
            Some(roster) => roster.handle(cmd),
            None => CircleRoster::empty(circle_id.clone()).handle(cmd),
        }
    }

    pub fn commit(&mut self, circle_id: &CircleId, events: &[RosterEvent]) {
        if events.is_empty() {
            return;
        }
        self.rosters
            .entry(circle_id.clone())
            .or_insert_with(|| CircleRoster::empty(circle_id.clone()))
            .apply_all(events);
    }
}
