//! # prospector-core
//!
//! Core types for the Prospector capture-and-outreach engine.
//!
//! Prospector reads the profile cards visible on a people-search results page,
//! turns each one into a [`Contact`], and optionally sends a bounded number of
//! connection invitations per page while streaming progress to observers.
//!
//! ## Contents
//!
//! - Data model: [`Contact`], [`Credentials`], [`RunConfiguration`], [`InviteRecord`]
//! - Unified error taxonomy: [`ProspectorError`]
//! - Repository configuration: [`config::ProspectorConfig`]
//! - Graceful degradation for non-critical steps: [`fail_open::fail_open`]

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::ProspectorConfig;
pub use error::{ProspectorError, Result};
pub use types::*;
