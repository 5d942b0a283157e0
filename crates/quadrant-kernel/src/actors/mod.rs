//! Workers and their coordinator.
//!
//! ```text
//! run_turns → Coordinator
//!   ├─ JobCounter::reset(Q)
//!   ├─ MailboxRing::open(Q) → fresh mailboxes + cancellation signal
//!   ├─ spawn QuadrantWorker × Q
//!   │   ├─ LocalRule::apply → Outbox::forward (increment, then send)
//!   │   ├─ decrement once for the pass
//!   │   └─ Mailbox::receive → apply, decrement … until Cancelled
//!   ├─ JobCounter::await_zero
//!   └─ TurnCancel::cancel → reclaim quadrants
//! ```
//!
//! Workers never reference each other. The ring of mailbox senders belongs
//! to the coordinator and resolves neighbours by index.

mod coordinator;
mod mailbox;
mod quadrant_worker;

pub use coordinator::Coordinator;
pub use mailbox::{Mailbox, MailboxRing, MailboxSender, TurnCancel};
pub use quadrant_worker::{QuadrantWorker, WorkerOutcome, WorkerReport, WorkerState};
