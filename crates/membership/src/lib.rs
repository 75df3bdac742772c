//! Membership workflow: per-circle application queue, approval/rejection,
//! member set and the exit rules tied to ownership.

pub mod book;
pub mod roster;

pub use book::MembershipBook;
pub use roster::{
    Application, ApplicationApproved, ApplicationRejected, ApplicationStatus, ApplicationSubmitted,
    ApproveApplication, CircleRoster, Enroll, ExitCircle, JoinReason, Member, MemberJoined,
    MemberLeft, RejectApplication, RosterCommand, RosterEvent, SubmitApplication,
};
