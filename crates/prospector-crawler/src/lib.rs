//! # prospector-crawler
//!
//! The capture-and-outreach workflow.
//!
//! A run signs in, waits for a manual second factor, then for each query opens
//! the people-search results, reads every card into a [`Contact`], and sends a
//! bounded number of connection invitations. Control flow is a pure state
//! machine ([`state_machine`]) interpreted by the [`Engine`] against a
//! [`prospector_browser::BrowserChannel`].
//!
//! Observers receive [`RunEvent`]s through a single [`EventSink`]. The final
//! [`RunReport`] carries the deduplicated contacts, ready for [`export_contacts`].
//!
//! [`Contact`]: prospector_core::Contact

pub mod dedup;
pub mod engine;
pub mod events;
pub mod export;
pub mod extract;
pub mod heuristics;
pub mod outreach;
pub mod scripts;
pub mod selectors;
pub mod state_machine;

pub use dedup::{dedup, dedup_key, normalize_profile_url};
pub use engine::{Engine, RunReport, SecondFactorWait};
pub use events::{ChannelSink, EventSink, RecordingSink, RunEvent};
pub use export::{export_contacts, read_contacts, CONTACT_HEADERS};
pub use extract::{parse_capture_payload, CapturedCard, Extractor, RawCard};
pub use heuristics::{is_noise, Heuristics};
pub use outreach::OutreachController;
