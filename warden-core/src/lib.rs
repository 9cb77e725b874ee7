//! Warden Core
//!
//! Core types shared by the warden daemon, client and CLI.
//!
//! This crate contains:
//! - Domain types: job identity, scheduler status, step outcomes, notification
//!   events and the mirrored state of remote workflow runs
//! - DTOs: wire shapes for the status API, the GitHub Actions API and the
//!   Telegram Bot API

pub mod domain;
pub mod dto;
