//! Data Transfer Objects
//!
//! Wire shapes exchanged with the daemon's status API and with the two
//! external HTTP services the daemon talks to.

pub mod github;
pub mod status;
pub mod telegram;
