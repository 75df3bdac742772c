use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use circles_core::{Aggregate, AggregateRoot, CircleId, Did, DomainError, Identity, Missing};
use circles_events::Event;

/// Aggregate root: Circle.
///
/// `disabled` is set once, when the last member leaves, and never cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circle {
    id: CircleId,
    name: String,
    owner: Identity,
    disabled: bool,
    version: u64,
    created: bool,
}

impl Circle {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: CircleId) -> Self {
        Self {
            id,
            name: String::new(),
            owner: Identity::new("", ""),
            disabled: false,
            version: 0,
            created: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn is_owner(&self, did: &Did) -> bool {
        self.created && self.owner.did == *did
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn ensure_owner(&self, caller: &Did) -> Result<(), DomainError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(DomainError::NotOwner)
        }
    }

    /// Disabled circles permanently refuse new applications.
    pub fn ensure_accepting_members(&self) -> Result<(), DomainError> {
        if self.disabled {
            Err(DomainError::CircleDisabled)
        } else {
            Ok(())
        }
    }
}

impl AggregateRoot for Circle {
    type Id = CircleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateCircle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCircle {
    pub circle_id: CircleId,
    pub name: String,
    pub owner: Identity,
    pub occurred_at: DateTime<Utc>,
}

/// Command: TransferOwnership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOwnership {
    pub circle_id: CircleId,
    pub caller: Did,
    pub new_owner: Identity,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DisableCircle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisableCircle {
    pub circle_id: CircleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircleCommand {
    CreateCircle(CreateCircle),
    TransferOwnership(TransferOwnership),
    DisableCircle(DisableCircle),
}

/// Event: CircleCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleCreated {
    pub circle_id: CircleId,
    pub name: String,
    pub owner: Identity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OwnershipTransferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransferred {
    pub circle_id: CircleId,
    pub previous_owner: Did,
    pub new_owner: Identity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CircleDisabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleDisabled {
    pub circle_id: CircleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircleEvent {
    CircleCreated(CircleCreated),
    OwnershipTransferred(OwnershipTransferred),
    CircleDisabled(CircleDisabled),
}

impl Event for CircleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircleEvent::CircleCreated(_) => "registry.circle.created",
            CircleEvent::OwnershipTransferred(_) => "registry.circle.ownership_transferred",
            CircleEvent::CircleDisabled(_) => "registry.circle.disabled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CircleEvent::CircleCreated(e) => e.occurred_at,
            CircleEvent::OwnershipTransferred(e) => e.occurred_at,
            CircleEvent::CircleDisabled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Circle {
    type Command = CircleCommand;
    type Event = CircleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CircleEvent::CircleCreated(e) => {
                self.id = e.circle_id.clone();
                self.name = e.name.clone();
                self.owner = e.owner.clone();
                self.disabled = false;
                self.created = true;
            }
            CircleEvent::OwnershipTransferred(e) => {
                self.owner = e.new_owner.clone();
            }
            CircleEvent::CircleDisabled(_) => {
                self.disabled = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CircleCommand::CreateCircle(cmd) => self.handle_create(cmd),
            CircleCommand::TransferOwnership(cmd) => self.handle_transfer(cmd),
            CircleCommand::DisableCircle(cmd) => self.handle_disable(cmd),
        }
    }
}

impl Circle {
    fn handle_create(&self, cmd: &CreateCircle) -> Result<Vec<CircleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::duplicate_id(cmd.circle_id.as_str()));
        }

        Ok(vec![CircleEvent::CircleCreated(CircleCreated {
            circle_id: cmd.circle_id.clone(),
            name: cmd.name.clone(),
            owner: cmd.owner.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transfer(&self, cmd: &TransferOwnership) -> Result<Vec<CircleEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(Missing::Circle));
        }
        self.ensure_owner(&cmd.caller)?;

        Ok(vec![CircleEvent::OwnershipTransferred(OwnershipTransferred {
            circle_id: self.id.clone(),
            previous_owner: self.owner.did.clone(),
            new_owner: cmd.new_owner.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_disable(&self, cmd: &DisableCircle) -> Result<Vec<CircleEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(Missing::Circle));
        }
        if self.disabled {
            return Ok(vec![]);
        }

        Ok(vec![CircleEvent::CircleDisabled(CircleDisabled {
            circle_id: self.id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
