use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use circles_core::{Aggregate, AggregateRoot, CircleId, Did, DomainError, Identity, Missing};
use circles_events::Event;

/// Review state of an application. Ordinals are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn ordinal(self) -> u8 {
        match self {
            ApplicationStatus::Pending => 0,
            ApplicationStatus::Approved => 1,
            ApplicationStatus::Rejected => 2,
        }
    }
}

/// One application per (circle, applicant); re-applying replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub applicant: Identity,
    pub credit_proof: String,
    pub status: ApplicationStatus,
}

/// How a member got into the circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinReason {
    /// Owner at circle creation.
    Founder,
    /// Approved application.
    Approval,
    /// Received ownership while not yet a member.
    OwnershipTransfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub identity: Identity,
    pub joined_via: JoinReason,
}

/// Aggregate root: the application queue and member set of one circle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircleRoster {
    circle_id: CircleId,
    applications: IndexMap<Did, Application>,
    members: IndexMap<Did, Member>,
    version: u64,
}

impl CircleRoster {
    pub fn empty(circle_id: CircleId) -> Self {
        Self {
            circle_id,
            applications: IndexMap::new(),
            members: IndexMap::new(),
            version: 0,
        }
    }

    pub fn is_member(&self, did: &Did) -> bool {
        self.members.contains_key(did)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Members in join order.
    pub fn members(&self) -> impl ExactSizeIterator<Item = &Member> {
        self.members.values()
    }

    /// Applications in first-submission order.
    pub fn applications(&self) -> impl ExactSizeIterator<Item = &Application> {
        self.applications.values()
    }

    pub fn application(&self, applicant: &Did) -> Option<&Application> {
        self.applications.get(applicant)
    }

    pub fn ensure_member(&self, did: &Did) -> Result<(), DomainError> {
        if self.is_member(did) {
            Ok(())
        } else {
            Err(DomainError::NotMember)
        }
    }

    fn pending(&self, applicant: &Did) -> Result<&Application, DomainError> {
        self.applications
            .get(applicant)
            .filter(|a| a.status == ApplicationStatus::Pending)
            .ok_or(DomainError::not_found(Missing::Application))
    }
}

impl AggregateRoot for CircleRoster {
    type Id = CircleId;

    fn id(&self) -> &Self::Id {
        &self.circle_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: Enroll (founder or incoming owner, no application involved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enroll {
    pub circle_id: CircleId,
    pub member: Identity,
    pub via: JoinReason,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitApplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitApplication {
    pub circle_id: CircleId,
    pub applicant: Identity,
    pub credit_proof: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveApplication. Owner authorization happens before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveApplication {
    pub circle_id: CircleId,
    pub applicant: Did,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectApplication. Owner authorization happens before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectApplication {
    pub circle_id: CircleId,
    pub applicant: Did,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ExitCircle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitCircle {
    pub circle_id: CircleId,
    pub member: Did,
    /// Current owner of the circle, looked up in the registry.
    pub owner: Did,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterCommand {
    Enroll(Enroll),
    SubmitApplication(SubmitApplication),
    ApproveApplication(ApproveApplication),
    RejectApplication(RejectApplication),
    ExitCircle(ExitCircle),
}

/// Event: ApplicationSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmitted {
    pub circle_id: CircleId,
    pub applicant: Identity,
    pub credit_proof: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ApplicationApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationApproved {
    pub circle_id: CircleId,
    pub applicant: Did,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ApplicationRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRejected {
    pub circle_id: CircleId,
    pub applicant: Did,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MemberJoined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberJoined {
    pub circle_id: CircleId,
    pub member: Identity,
    pub via: JoinReason,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MemberLeft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLeft {
    pub circle_id: CircleId,
    pub member: Did,
    /// Members left after this exit; zero means the circle must be disabled.
    pub remaining_members: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterEvent {
    ApplicationSubmitted(ApplicationSubmitted),
    ApplicationApproved(ApplicationApproved),
    ApplicationRejected(ApplicationRejected),
    MemberJoined(MemberJoined),
    MemberLeft(MemberLeft),
}

impl Event for RosterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RosterEvent::ApplicationSubmitted(_) => "membership.application.submitted",
            RosterEvent::ApplicationApproved(_) => "membership.application.approved",
            RosterEvent::ApplicationRejected(_) => "membership.application.rejected",
            RosterEvent::MemberJoined(_) => "membership.member.joined",
            RosterEvent::MemberLeft(_) => "membership.member.left",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RosterEvent::ApplicationSubmitted(e) => e.occurred_at,
            RosterEvent::ApplicationApproved(e) => e.occurred_at,
            RosterEvent::ApplicationRejected(e) => e.occurred_at,
            RosterEvent::MemberJoined(e) => e.occurred_at,
            RosterEvent::MemberLeft(e) => e.occurred_at,
        }
    }
}

impl Aggregate for CircleRoster {
    type Command = RosterCommand;
    type Event = RosterEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RosterEvent::ApplicationSubmitted(e) => {
                // Re-submission keeps the original queue position.
                self.applications.insert(
                    e.applicant.did.clone(),
                    Application {
                        applicant: e.applicant.clone(),
                        credit_proof: e.credit_proof.clone(),
                        status: ApplicationStatus::Pending,
                    },
                );
            }
            RosterEvent::ApplicationApproved(e) => {
                if let Some(app) = self.applications.get_mut(&e.applicant) {
                    app.status = ApplicationStatus::Approved;
                }
            }
            RosterEvent::ApplicationRejected(e) => {
                if let Some(app) = self.applications.get_mut(&e.applicant) {
                    app.status = ApplicationStatus::Rejected;
                }
            }
            RosterEvent::MemberJoined(e) => {
                self.members.insert(
                    e.member.did.clone(),
                    Member {
                        identity: e.member.clone(),
                        joined_via: e.via,
                    },
                );
            }
            RosterEvent::MemberLeft(e) => {
                self.members.shift_remove(&e.member);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RosterCommand::Enroll(cmd) => self.handle_enroll(cmd),
            RosterCommand::SubmitApplication(cmd) => self.handle_submit(cmd),
            RosterCommand::ApproveApplication(cmd) => self.handle_approve(cmd),
            RosterCommand::RejectApplication(cmd) => self.handle_reject(cmd),
            RosterCommand::ExitCircle(cmd) => self.handle_exit(cmd),
        }
    }
}

impl CircleRoster {
    fn handle_enroll(&self, cmd: &Enroll) -> Result<Vec<RosterEvent>, DomainError> {
        if self.is_member(&cmd.member.did) {
            return Ok(vec![]);
        }

        let mut events = Vec::new();

        // A pending application of someone enrolled another way is resolved
        // here; it could never be approved once they are a member.
        if self.pending(&cmd.member.did).is_ok() {
            events.push(RosterEvent::ApplicationApproved(ApplicationApproved {
                circle_id: self.circle_id.clone(),
                applicant: cmd.member.did.clone(),
                occurred_at: cmd.occurred_at,
            }));
        }

        events.push(RosterEvent::MemberJoined(MemberJoined {
            circle_id: self.circle_id.clone(),
            member: cmd.member.clone(),
            via: cmd.via,
            occurred_at: cmd.occurred_at,
        }));
        Ok(events)
    }

    fn handle_submit(&self, cmd: &SubmitApplication) -> Result<Vec<RosterEvent>, DomainError> {
        if self.is_member(&cmd.applicant.did) {
            return Err(DomainError::AlreadyMember);
        }

        Ok(vec![RosterEvent::ApplicationSubmitted(ApplicationSubmitted {
            circle_id: self.circle_id.clone(),
            applicant: cmd.applicant.clone(),
            credit_proof: cmd.credit_proof.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveApplication) -> Result<Vec<RosterEvent>, DomainError> {
        let application = self.pending(&cmd.applicant)?;
        if self.is_member(&cmd.applicant) {
            return Err(DomainError::AlreadyMember);
        }

        Ok(vec![
            RosterEvent::ApplicationApproved(ApplicationApproved {
                circle_id: self.circle_id.clone(),
                applicant: cmd.applicant.clone(),
                occurred_at: cmd.occurred_at,
            }),
            RosterEvent::MemberJoined(MemberJoined {
                circle_id: self.circle_id.clone(),
                member: application.applicant.clone(),
                via: JoinReason::Approval,
                occurred_at: cmd.occurred_at,
            }),
        ])
    }

    fn handle_reject(&self, cmd: &RejectApplication) -> Result<Vec<RosterEvent>, DomainError> {
        self.pending(&cmd.applicant)?;

        Ok(vec![RosterEvent::ApplicationRejected(ApplicationRejected {
            circle_id: self.circle_id.clone(),
            applicant: cmd.applicant.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_exit(&self, cmd: &ExitCircle) -> Result<Vec<RosterEvent>, DomainError> {
        self.ensure_member(&cmd.member)?;

        let remaining = self.members.len() - 1;
        if cmd.member == cmd.owner && remaining > 0 {
            return Err(DomainError::OwnerMustTransferFirst);
        }

        Ok(vec![RosterEvent::MemberLeft(MemberLeft {
            circle_id: self.circle_id.clone(),
            member: cmd.member.clone(),
            remaining_members: remaining as u64,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "did:admin";
    const USER1: &str = "did:user1";

    fn circle_id() -> CircleId {
        CircleId::from("c-1")
    }

    fn run(roster: &mut CircleRoster, cmd: RosterCommand) -> Result<Vec<RosterEvent>, DomainError> {
        let events = roster.handle(&cmd)?;
        roster.apply_all(&events);
        Ok(events)
    }

    fn founded_roster() -> CircleRoster {
        let mut roster = CircleRoster::empty(circle_id());
        run(
            &mut roster,
            RosterCommand::Enroll(Enroll {
                circle_id: circle_id(),
                member: Identity::new(OWNER, "admin-org"),
                via: JoinReason::Founder,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        roster
    }

    fn submit(did: &str, proof: &str) -> RosterCommand {
        RosterCommand::SubmitApplication(SubmitApplication {
            circle_id: circle_id(),
            applicant: Identity::new(did, "user-org"),
            credit_proof: proof.to_string(),
            occurred_at: Utc::now(),
        })
    }

    fn approve(did: &str) -> RosterCommand {
        RosterCommand::ApproveApplication(ApproveApplication {
            circle_id: circle_id(),
            applicant: Did::from(did),
            occurred_at: Utc::now(),
        })
    }

    fn reject(did: &str) -> RosterCommand {
        RosterCommand::RejectApplication(RejectApplication {
            circle_id: circle_id(),
            applicant: Did::from(did),
            occurred_at: Utc::now(),
        })
    }

    fn exit(did: &str) -> RosterCommand {
        RosterCommand::ExitCircle(ExitCircle {
            circle_id: circle_id(),
            member: Did::from(did),
            owner: Did::from(OWNER),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn approval_adds_exactly_one_member() {
        let mut roster = founded_roster();
        run(&mut roster, submit(USER1, "credit-123")).unwrap();
        assert_eq!(roster.member_count(), 1);

        let events = run(&mut roster, approve(USER1)).unwrap();
        assert!(matches!(events[0], RosterEvent::ApplicationApproved(_)));
        assert!(matches!(events[1], RosterEvent::MemberJoined(_)));

        assert_eq!(roster.member_count(), 2);
        assert!(roster.is_member(&Did::from(USER1)));
        assert_eq!(
            roster.application(&Did::from(USER1)).unwrap().status,
            ApplicationStatus::Approved
        );
    }

    #[test]
    fn rejection_keeps_member_count_and_marks_status() {
        let mut roster = founded_roster();
        run(&mut roster, submit(USER1, "credit-123")).unwrap();
        run(&mut roster, reject(USER1)).unwrap();

        assert_eq!(roster.member_count(), 1);
        let app = roster.application(&Did::from(USER1)).unwrap();
        assert_eq!(app.status, ApplicationStatus::Rejected);
        assert_eq!(app.status.ordinal(), 2);
    }

    #[test]
    fn resolved_applications_are_terminal() {
        let mut roster = founded_roster();
        run(&mut roster, submit(USER1, "p")).unwrap();
        run(&mut roster, reject(USER1)).unwrap();

        assert_eq!(
            run(&mut roster, approve(USER1)).unwrap_err(),
            DomainError::not_found(Missing::Application)
        );
        assert_eq!(
            run(&mut roster, reject(USER1)).unwrap_err(),
            DomainError::not_found(Missing::Application)
        );
    }

    #[test]
    fn reapplying_overwrites_in_place() {
        let mut roster = founded_roster();
        run(&mut roster, submit(USER1, "first")).unwrap();
        run(&mut roster, submit("did:user2", "other")).unwrap();
        run(&mut roster, submit(USER1, "second")).unwrap();

        let apps: Vec<&Application> = roster.applications().collect();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].applicant.did, Did::from(USER1));
        assert_eq!(apps[0].credit_proof, "second");
        assert_eq!(apps[0].status, ApplicationStatus::Pending);
    }

    #[test]
    fn rejected_applicant_can_reapply() {
        let mut roster = founded_roster();
        run(&mut roster, submit(USER1, "p")).unwrap();
        run(&mut roster, reject(USER1)).unwrap();
        run(&mut roster, submit(USER1, "p2")).unwrap();

        assert_eq!(
            roster.application(&Did::from(USER1)).unwrap().status,
            ApplicationStatus::Pending
        );
        run(&mut roster, approve(USER1)).unwrap();
        assert!(roster.is_member(&Did::from(USER1)));
    }

    #[test]
    fn members_cannot_apply() {
        let mut roster = founded_roster();
        assert_eq!(
            run(&mut roster, submit(OWNER, "p")).unwrap_err(),
            DomainError::AlreadyMember
        );
    }

    #[test]
    fn member_exit_removes_only_that_member() {
        let mut roster = founded_roster();
        run(&mut roster, submit(USER1, "p")).unwrap();
        run(&mut roster, approve(USER1)).unwrap();

        let events = run(&mut roster, exit(USER1)).unwrap();
        match &events[0] {
            RosterEvent::MemberLeft(e) => assert_eq!(e.remaining_members, 1),
            other => panic!("Expected MemberLeft, got {other:?}"),
        }
        assert!(!roster.is_member(&Did::from(USER1)));
        assert!(roster.is_member(&Did::from(OWNER)));
    }

    #[test]
    fn owner_cannot_exit_while_others_remain() {
        let mut roster = founded_roster();
        run(&mut roster, submit(USER1, "p")).unwrap();
        run(&mut roster, approve(USER1)).unwrap();

        let before = roster.clone();
        assert_eq!(
            run(&mut roster, exit(OWNER)).unwrap_err(),
            DomainError::OwnerMustTransferFirst
        );
        assert_eq!(roster, before);
    }

    #[test]
    fn sole_owner_exit_reports_zero_remaining() {
        let mut roster = founded_roster();
        let events = run(&mut roster, exit(OWNER)).unwrap();
        match &events[0] {
            RosterEvent::MemberLeft(e) => assert_eq!(e.remaining_members, 0),
            other => panic!("Expected MemberLeft, got {other:?}"),
        }
        assert_eq!(roster.member_count(), 0);
    }

    #[test]
    fn non_member_exit_is_rejected() {
        let mut roster = founded_roster();
        assert_eq!(run(&mut roster, exit(USER1)).unwrap_err(), DomainError::NotMember);
    }

    #[test]
    fn enrolling_an_existing_member_is_a_no_op() {
        let mut roster = founded_roster();
        let events = run(
            &mut roster,
            RosterCommand::Enroll(Enroll {
                circle_id: circle_id(),
                member: Identity::new(OWNER, "renamed"),
                via: JoinReason::OwnershipTransfer,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert!(events.is_empty());
        assert_eq!(roster.members().next().unwrap().identity.org_name, "admin-org");
    }

    #[test]
    fn enrolling_a_pending_applicant_approves_the_application() {
        let mut roster = founded_roster();
        run(&mut roster, submit(USER1, "credit-123")).unwrap();

        let events = run(
            &mut roster,
            RosterCommand::Enroll(Enroll {
                circle_id: circle_id(),
                member: Identity::new(USER1, "user-org"),
                via: JoinReason::OwnershipTransfer,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert!(matches!(events[0], RosterEvent::ApplicationApproved(_)));
        assert!(matches!(events[1], RosterEvent::MemberJoined(_)));
        assert_eq!(
            roster.application(&Did::from(USER1)).unwrap().status,
            ApplicationStatus::Approved
        );
        assert!(roster.is_member(&Did::from(USER1)));
    }
}
