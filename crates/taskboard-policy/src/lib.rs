//! Access policy for taskboard projects and tasks
//!
//! Every authorization decision in the system is made here, by a pure function of
//! the caller, a snapshot of the project's ownership and team, and a tagged action.
//! Nothing in this crate performs I/O, so the whole rule set can be exercised
//! without a database or an HTTP stack.

pub mod caller;
pub mod evaluator;

pub use caller::{Caller, SystemRole};
pub use evaluator::{
    authorize, decide, AccessDenied, Action, Decision, Member, MemberRole, ProjectAction,
    ProjectGuard, Resource, TaskAction,
};
