//! Connection invitations under a per-page cap
//!
//! The controller only knows about the per-page cap. The weekly quota is the
//! concern of whoever consumes [`RunEvent::InviteSent`].

use crate::events::{EventSink, RunEvent};
use crate::extract::CapturedCard;
use crate::{scripts, selectors};
use prospector_browser::BrowserChannel;
use prospector_core::config::TimingConfig;
use prospector_core::{ProspectorError, Result};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Connect and send were both activated
    Sent,
    /// No connect control on the card
    NoConnect,
    /// Connect was clicked but no confirmation control appeared
    Unconfirmed,
}

/// Random delay between two connect attempts
fn jitter(timing: &TimingConfig) -> Duration {
    let (min, max) = (timing.jitter_min_ms, timing.jitter_max_ms.max(timing.jitter_min_ms));
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

/// Sends invitations for the cards of one results page
pub struct OutreachController<'a, C: BrowserChannel> {
    channel: &'a C,
    timing: &'a TimingConfig,
    max_per_page: usize,
}

impl<'a, C: BrowserChannel> OutreachController<'a, C> {
    pub fn new(channel: &'a C, timing: &'a TimingConfig, max_per_page: usize) -> Self {
        Self {
            channel,
            timing,
            max_per_page,
        }
    }

    /// Attempt cards in order until the per-page cap is reached
    ///
    /// Returns the number of invitations sent. Failed attempts are reported
    /// through the sink and never abort the page.
    pub async fn run_page(
        &self,
        cards: &[CapturedCard],
        source_query: &str,
        sink: &dyn EventSink,
    ) -> usize {
        let mut sent = 0;
        for (attempt, card) in cards.iter().enumerate() {
            if sent >= self.max_per_page {
                break;
            }
            if attempt > 0 {
                self.channel.sleep(jitter(self.timing)).await;
            }

            match self.attempt(card.index).await {
                Ok(Attempt::Sent) => {
                    sent += 1;
                    sink.emit(RunEvent::InviteSent {
                        contact: card.contact.clone(),
                        source_query: source_query.to_string(),
                    });
                }
                Ok(Attempt::NoConnect) => {
                    debug!(index = card.index, "no connect control");
                }
                Ok(Attempt::Unconfirmed) => {
                    debug!(index = card.index, "connect clicked but not confirmed");
                }
                Err(e) => {
                    warn!(index = card.index, "connect attempt failed: {}", e);
                    sink.emit(RunEvent::Log(format!(
                        "Could not invite {}: {}",
                        card.contact.name, e
                    )));
                }
            }
        }
        sent
    }

    /// One connect-then-send sequence for the card at DOM index `index`
    pub async fn attempt(&self, index: usize) -> Result<Attempt> {
        if !self.locate(&scripts::locate_connect(index)).await? {
            return Ok(Attempt::NoConnect);
        }
        self.click(&selectors::connect_target(index)).await?;
        self.channel.sleep(self.timing.confirm_delay()).await;

        if !self.locate(&scripts::locate_send()).await? {
            return Ok(Attempt::Unconfirmed);
        }
        self.click(&selectors::send_target()).await?;
        Ok(Attempt::Sent)
    }

    async fn locate(&self, script: &str) -> Result<bool> {
        let found = self
            .channel
            .evaluate(script)
            .await
            .map_err(|e| ProspectorError::Action(e.to_string()))?;
        Ok(found.as_bool().unwrap_or(false))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.channel
            .click(selector)
            .await
            .map_err(|e| ProspectorError::Action(e.to_string()))
    }
}
