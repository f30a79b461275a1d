//! # prospector-ledger
//!
//! Durable record of sent invitations.
//!
//! This crate provides:
//! - [`InviteLedger`]: an append-only CSV file of [`InviteRecord`]s
//! - [`WeeklyQuota`]: per-user invite counts for the current Monday-based week
//! - [`QuotaGate`]: the quota check and the ledger append as one step
//!
//! [`InviteRecord`]: prospector_core::InviteRecord

mod quota;
mod storage;

pub use quota::{week_bounds, QuotaDecision, QuotaGate, QuotaStats, WeeklyQuota};
pub use storage::{InviteLedger, InvitePage, LEDGER_HEADERS};
