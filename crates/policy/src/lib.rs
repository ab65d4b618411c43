//! Role-based authorization for the scuttlebutt content platform.
//!
//! Core principle: **every request is decided here before any mutation is
//! attempted.** The engine is a pure function from an [`Actor`] snapshot and
//! an [`Action`] to a [`Decision`]; it holds no state and performs no I/O,
//! so callers may evaluate concurrently without synchronization.
//!
//! Precedence is fixed: administrator bypass (with the hardcoded-role
//! exception), then the disablement gate, then the per-action rule. Deny
//! reasons are a closed enum whose messages are part of the external
//! contract — they reach the caller verbatim.

mod action;
mod engine;
mod error;

pub use action::{Action, Actor, ContentKind, Decision, DenyReason};
pub use engine::evaluate;
pub use error::{Error, Result};
