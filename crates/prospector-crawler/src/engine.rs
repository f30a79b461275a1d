//! Workflow engine
//!
//! Interprets the actions of [`crate::state_machine`] against a browser
//! channel. The engine owns its channel and is consumed by [`Engine::run`],
//! so a session can never serve two runs.

use crate::dedup::dedup;
use crate::events::{EventSink, RunEvent};
use crate::extract::{parse_capture_payload, CapturedCard, Extractor};
use crate::outreach::OutreachController;
use crate::scripts;
use crate::selectors::{
    LOGIN_EMAIL, LOGIN_PASSWORD, LOGIN_PATH, LOGIN_SUBMIT, RESULTS_CONTAINER, SEARCH_PATH,
};
use crate::state_machine::{transition, Action, Event, State};
use prospector_browser::BrowserChannel;
use prospector_core::fail_open::fail_open;
use prospector_core::{
    Contact, Credentials, ProspectorConfig, ProspectorError, Result, RunConfiguration,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// How the run waits for a manual second-factor step
#[derive(Debug)]
pub enum SecondFactorWait {
    /// Sleep for a fixed window
    Fixed(Duration),
    /// Wait for an operator acknowledgment, but never longer than `max_wait`
    Acknowledged {
        signal: oneshot::Receiver<()>,
        max_wait: Duration,
    },
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub queries: usize,
    /// Contacts captured across all queries, before dedup
    pub captured: usize,
    pub invites_sent: usize,
    /// Queries whose results page could not be opened
    pub failed_queries: Vec<String>,
    /// Deduplicated contacts in first-seen order
    pub contacts: Vec<Contact>,
}

/// Mutable bookkeeping of one run
#[derive(Default)]
struct RunContext {
    all_contacts: Vec<Contact>,
    page: Vec<CapturedCard>,
    invites_sent: usize,
    failed_queries: Vec<String>,
    auth_error: Option<String>,
}

/// Capture-and-outreach workflow over one browser channel
pub struct Engine<C: BrowserChannel> {
    channel: C,
    config: ProspectorConfig,
    extractor: Extractor,
    sink: Arc<dyn EventSink>,
    second_factor: Option<SecondFactorWait>,
}

impl<C: BrowserChannel> Engine<C> {
    pub fn new(channel: C, config: &ProspectorConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        let extractor = Extractor::new(&config.heuristics, &config.site.base_url)?;
        Ok(Self {
            channel,
            config: config.clone(),
            extractor,
            sink,
            second_factor: Some(SecondFactorWait::Fixed(config.timing.second_factor_wait())),
        })
    }

    pub fn with_second_factor(mut self, wait: SecondFactorWait) -> Self {
        self.second_factor = Some(wait);
        self
    }

    /// Execute the whole workflow
    ///
    /// Only authentication failures (and invalid input) are returned as
    /// errors. Query, extraction and action failures are logged through the
    /// sink and the run carries on.
    pub async fn run(
        self,
        credentials: &Credentials,
        run_config: &RunConfiguration,
    ) -> Result<RunReport> {
        credentials.validate()?;
        run_config.validate()?;

        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        self.drive(credentials, run_config).instrument(span).await
    }

    async fn drive(
        mut self,
        credentials: &Credentials,
        run_config: &RunConfiguration,
    ) -> Result<RunReport> {
        info!(queries = run_config.queries.len(), "Run started");
        let mut ctx = RunContext::default();
        let mut state = State::Idle;
        let mut pending = VecDeque::from([Event::Start {
            total: run_config.queries.len(),
            headless: run_config.headless,
        }]);

        while let Some(event) = pending.pop_front() {
            let (next, actions) = transition(state, event);
            state = next;
            for action in actions {
                if let Some(event) = self
                    .perform(action, &mut ctx, credentials, run_config)
                    .await
                {
                    pending.push_back(event);
                }
            }
        }

        match state {
            State::Done { summary } => {
                let captured = ctx.all_contacts.len();
                let report = RunReport {
                    queries: run_config.queries.len(),
                    captured,
                    invites_sent: ctx.invites_sent,
                    failed_queries: ctx.failed_queries,
                    contacts: dedup(ctx.all_contacts),
                };
                info!(
                    captured = report.captured,
                    unique = report.contacts.len(),
                    invites = report.invites_sent,
                    "{}",
                    summary
                );
                Ok(report)
            }
            State::Failed { error } => match ctx.auth_error {
                Some(reason) => Err(ProspectorError::Auth(reason)),
                None => Err(ProspectorError::Other(error)),
            },
            other => Err(ProspectorError::Other(format!(
                "Run stopped in unexpected state: {:?}",
                other
            ))),
        }
    }

    async fn perform(
        &mut self,
        action: Action,
        ctx: &mut RunContext,
        credentials: &Credentials,
        run_config: &RunConfiguration,
    ) -> Option<Event> {
        match action {
            Action::Log { message } => {
                self.sink.emit(RunEvent::Log(message));
                None
            }

            Action::Authenticate => match self.authenticate(credentials).await {
                Ok(()) => Some(Event::AuthSucceeded),
                Err(e) => {
                    let reason = match e {
                        ProspectorError::Auth(reason) => reason,
                        other => other.to_string(),
                    };
                    ctx.auth_error = Some(reason.clone());
                    Some(Event::AuthFailed { reason })
                }
            },

            Action::AwaitSecondFactor => {
                let wait = self
                    .second_factor
                    .take()
                    .unwrap_or(SecondFactorWait::Fixed(Duration::ZERO));
                self.await_second_factor(wait).await;
                Some(Event::SecondFactorElapsed)
            }

            Action::ConcealWindow => {
                let script = scripts::conceal_window();
                let channel = &self.channel;
                fail_open("conceal_window", || channel.evaluate(&script)).await;
                None
            }

            Action::OpenSearch { index } => {
                let query = &run_config.queries[index];
                self.log(format!(
                    "Searching ({}/{}): {}",
                    index + 1,
                    run_config.queries.len(),
                    query
                ));
                match self.open_search(query).await {
                    Ok(()) => Some(Event::SearchReady),
                    Err(e) => {
                        warn!(query = %query, "query failed: {}", e);
                        ctx.failed_queries.push(query.clone());
                        Some(Event::QueryFailed {
                            reason: e.to_string(),
                        })
                    }
                }
            }

            Action::Capture { index } => {
                let query = &run_config.queries[index];
                let cards = match self.capture(run_config.max_cards_per_page).await {
                    Ok(cards) => cards,
                    Err(e) => {
                        warn!(query = %query, "capture failed: {}", e);
                        self.log(format!("Capture failed for '{}': {}", query, e));
                        Vec::new()
                    }
                };
                for card in &cards {
                    self.sink.emit(RunEvent::Captured(card.contact.clone()));
                    ctx.all_contacts.push(card.contact.clone());
                }
                ctx.page = cards;
                Some(Event::CardsCaptured {
                    count: ctx.page.len(),
                })
            }

            Action::Connect { index } => {
                let query = &run_config.queries[index];
                let page = std::mem::take(&mut ctx.page);
                let invites = OutreachController::new(
                    &self.channel,
                    &self.config.timing,
                    run_config.max_connects_per_page,
                )
                .run_page(&page, query, self.sink.as_ref())
                .await;
                ctx.invites_sent += invites;
                Some(Event::OutreachFinished { invites })
            }

            Action::Finish => None,
        }
    }

    fn log(&self, line: String) {
        self.sink.emit(RunEvent::Log(line));
    }

    fn site_url(&self, path: &str) -> String {
        format!("{}{}", self.config.site.base_url.trim_end_matches('/'), path)
    }

    /// The people-search URL for `query`; spaces are encoded as `+`
    pub fn search_url(&self, query: &str) -> Result<String> {
        let mut url = Url::parse(&self.site_url(SEARCH_PATH))
            .map_err(|e| ProspectorError::Config(format!("Invalid base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("keywords", query)
            .append_pair("origin", "CLUSTER_EXPANSION");
        Ok(url.into())
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        let auth = |e: ProspectorError| ProspectorError::Auth(e.to_string());
        let timing = &self.config.timing;

        self.log("Opening login page".to_string());
        self.channel
            .navigate(&self.site_url(LOGIN_PATH))
            .await
            .map_err(auth)?;
        self.channel
            .wait_visible(LOGIN_EMAIL, timing.results_timeout())
            .await
            .map_err(auth)?;
        self.channel
            .fill(LOGIN_EMAIL, &credentials.email)
            .await
            .map_err(auth)?;
        self.channel
            .fill(LOGIN_PASSWORD, &credentials.password)
            .await
            .map_err(auth)?;
        self.channel.click(LOGIN_SUBMIT).await.map_err(auth)?;
        self.channel.sleep(timing.login_settle()).await;

        let landed = self
            .channel
            .evaluate(&scripts::current_url())
            .await
            .map_err(auth)?;
        if landed.as_str().is_some_and(|url| url.contains(LOGIN_PATH)) {
            return Err(ProspectorError::Auth(
                "still on the login page after submitting credentials".to_string(),
            ));
        }
        debug!(url = %landed, "login settled");
        Ok(())
    }

    async fn await_second_factor(&self, wait: SecondFactorWait) {
        match wait {
            SecondFactorWait::Fixed(duration) => {
                self.log(format!(
                    "Waiting {}s for a second-factor step",
                    duration.as_secs()
                ));
                self.channel.sleep(duration).await;
            }
            SecondFactorWait::Acknowledged { signal, max_wait } => {
                self.log(format!(
                    "Waiting up to {}s for second-factor confirmation",
                    max_wait.as_secs()
                ));
                let started = tokio::time::Instant::now();
                match tokio::time::timeout(max_wait, signal).await {
                    Ok(Ok(())) => debug!("second factor acknowledged"),
                    Ok(Err(_)) => {
                        // No acknowledgment can arrive any more; keep the window open
                        debug!("acknowledgment sender dropped, waiting out the window");
                        self.channel
                            .sleep(max_wait.saturating_sub(started.elapsed()))
                            .await;
                    }
                    Err(_) => warn!("no second-factor acknowledgment, continuing"),
                }
            }
        }
    }

    async fn open_search(&self, query: &str) -> Result<()> {
        let timing = &self.config.timing;
        let url = self.search_url(query)?;

        self.channel
            .navigate(&url)
            .await
            .map_err(|e| ProspectorError::query(query, e))?;
        self.channel
            .wait_visible(RESULTS_CONTAINER, timing.results_timeout())
            .await
            .map_err(|e| ProspectorError::query(query, e))?;

        let channel = &self.channel;
        let scroll = scripts::scroll_pulse();
        for _ in 0..timing.scroll_pulses {
            channel.sleep(timing.scroll_pulse()).await;
            fail_open("scroll_pulse", || channel.evaluate(&scroll)).await;
        }

        let count_script = scripts::count_profiles();
        if let Some(count) = fail_open("count_profiles", || channel.evaluate(&count_script)).await
        {
            self.log(format!(
                "{} profile links visible",
                count.as_u64().unwrap_or(0)
            ));
        }
        Ok(())
    }

    async fn capture(&self, max_cards: usize) -> Result<Vec<CapturedCard>> {
        let payload = self
            .channel
            .evaluate(&scripts::capture_cards())
            .await
            .map_err(|e| ProspectorError::Extraction(e.to_string()))?;
        let cards = parse_capture_payload(&payload)?;
        Ok(self.extractor.extract_page(&cards, max_cards))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use prospector_browser::MockChannel;

    fn engine(mock: MockChannel) -> Engine<MockChannel> {
        Engine::new(mock, &ProspectorConfig::default(), Arc::new(RecordingSink::new())).unwrap()
    }

    #[test]
    fn test_search_url_encodes_spaces() {
        let url = engine(MockChannel::new()).search_url("sales manager").unwrap();
        assert_eq!(
            url,
            "https://www.linkedin.com/search/results/people/?keywords=sales+manager&origin=CLUSTER_EXPANSION"
        );
    }

    #[test]
    fn test_search_url_escapes_reserved_characters() {
        let url = engine(MockChannel::new()).search_url("r&d lead").unwrap();
        assert!(url.contains("keywords=r%26d+lead&"));
    }

    #[tokio::test]
    async fn test_acknowledged_wait_returns_on_signal() {
        let (tx, rx) = oneshot::channel();
        tx.send(()).unwrap();
        let engine = engine(MockChannel::new());
        let started = std::time::Instant::now();
        engine
            .await_second_factor(SecondFactorWait::Acknowledged {
                signal: rx,
                max_wait: Duration::from_secs(60),
            })
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_dropped_acknowledgment_waits_out_the_window() {
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        let mock = MockChannel::new();
        engine(mock.clone())
            .await_second_factor(SecondFactorWait::Acknowledged {
                signal: rx,
                max_wait: Duration::from_secs(60),
            })
            .await;
        assert!(mock.slept() > Duration::from_secs(59));
    }

    #[tokio::test]
    async fn test_acknowledged_wait_is_bounded() {
        let (_tx, rx) = oneshot::channel::<()>();
        let engine = engine(MockChannel::new());
        engine
            .await_second_factor(SecondFactorWait::Acknowledged {
                signal: rx,
                max_wait: Duration::from_millis(20),
            })
            .await;
    }
}
