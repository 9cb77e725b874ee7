//! Core domain types
//!
//! These types describe the lifecycle of a workflow job and of the remote
//! runs the poller mirrors. They hold structure only; the daemon owns all
//! behavior and synchronization.

pub mod event;
pub mod job;
pub mod remote;
pub mod status;
