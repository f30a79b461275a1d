//! Browser control channel for Prospector
//!
//! The crawler never talks to Chrome directly. It drives a [`BrowserChannel`],
//! a five-verb abstraction (navigate, wait-for-visible, evaluate, click, sleep)
//! plus `fill` for typing credentials. Two implementations ship here:
//!
//! - [`BrowserSession`]: a real Chrome/Chromium tab over the DevTools Protocol
//! - [`MockChannel`]: a scriptable in-memory channel for tests
//!
//! # Example
//!
//! ```no_run
//! use prospector_browser::{BrowserChannel, BrowserConfig, BrowserSession};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = BrowserSession::launch_with_config(BrowserConfig::default()).await?;
//!     session.navigate("https://example.com").await?;
//!     session.wait_visible("main", Duration::from_secs(10)).await?;
//!     let title = session.evaluate("document.title").await?;
//!     println!("{}", title);
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium installed
//! - To attach to an existing browser: `chrome --remote-debugging-port=9222`

pub mod browser;
pub mod channel;
pub mod mock;

pub use browser::{BrowserConfig, BrowserSession};
pub use channel::{script_tag, tagged_script, BrowserChannel};
pub use mock::{ChannelCall, MockChannel};
pub use prospector_core::{ProspectorError, Result};
