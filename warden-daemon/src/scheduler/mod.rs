//! Scheduler layer
//!
//! Decides when work starts:
//! - [`JobScheduler`] runs the local workflow under a single-flight guard,
//!   fed by manual, periodic and startup triggers
//! - [`RemotePoller`] keeps exactly one remote CI run active by polling the
//!   remote system and dispatching when nothing is running

pub mod job;
pub mod poller;
pub mod timer;

pub use job::{JobScheduler, SchedulerError};
pub use poller::{PollerError, PollerSettings, RemotePoller};
