//! Scriptable in-memory browser channel for testing
//!
//! Scripts are answered by their `/*prospector:<tag>*/` marker. Each tag holds
//! a queue of responses: values are popped in order and the last one is
//! repeated once the queue is down to a single entry. Unknown tags answer
//! `null`. Every call is recorded so tests can assert on the exact sequence.

use crate::channel::{script_tag, BrowserChannel};
use async_trait::async_trait;
use prospector_core::{ProspectorError, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One recorded channel call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Navigate(String),
    WaitVisible(String),
    /// Script tag, or `"untagged"`
    Evaluate(String),
    Click(String),
    /// Selector only; typed text is never recorded
    Fill(String),
    Sleep(Duration),
}

#[derive(Default)]
struct MockState {
    responses: HashMap<String, VecDeque<Value>>,
    failing_tags: HashSet<String>,
    failing_selectors: HashSet<String>,
    failing_urls: Vec<String>,
    calls: Vec<ChannelCall>,
}

/// Mock browser channel
///
/// Clones share state, so a test can keep a handle while the engine owns
/// another.
#[derive(Clone, Default)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for scripts carrying `tag`
    pub fn with_response(self, tag: &str, value: Value) -> Self {
        self.lock()
            .responses
            .entry(tag.to_string())
            .or_default()
            .push_back(value);
        self
    }

    /// Queue several responses for `tag`, answered in order
    pub fn with_responses<I>(self, tag: &str, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        {
            let mut state = self.lock();
            let queue = state.responses.entry(tag.to_string()).or_default();
            queue.extend(values);
        }
        self
    }

    /// Make every script carrying `tag` fail
    pub fn failing_script(self, tag: &str) -> Self {
        self.lock().failing_tags.insert(tag.to_string());
        self
    }

    /// Make `wait_visible`, `click` and `fill` fail for `selector`
    pub fn failing_selector(self, selector: &str) -> Self {
        self.lock().failing_selectors.insert(selector.to_string());
        self
    }

    /// Make navigation fail for any URL containing `fragment`
    pub fn failing_navigation(self, fragment: &str) -> Self {
        self.lock().failing_urls.push(fragment.to_string());
        self
    }

    /// Snapshot of all calls so far
    pub fn calls(&self) -> Vec<ChannelCall> {
        self.lock().calls.clone()
    }

    /// Number of evaluations of scripts carrying `tag`
    pub fn evaluations(&self, tag: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, ChannelCall::Evaluate(t) if t == tag))
            .count()
    }

    /// Selectors clicked, in order
    pub fn clicks(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Click(selector) => Some(selector.clone()),
                _ => None,
            })
            .collect()
    }

    /// URLs navigated to, in order
    pub fn navigations(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Navigate(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Total requested sleep time
    pub fn slept(&self) -> Duration {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Sleep(d) => Some(*d),
                _ => None,
            })
            .sum()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_selector(state: &MockState, selector: &str) -> Result<()> {
        if state.failing_selectors.contains(selector) {
            return Err(ProspectorError::Channel(format!(
                "Element not found: {}",
                selector
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserChannel for MockChannel {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(ChannelCall::Navigate(url.to_string()));
        if state.failing_urls.iter().any(|fragment| url.contains(fragment)) {
            return Err(ProspectorError::Channel(format!(
                "Failed to navigate to {}",
                url
            )));
        }
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, _timeout: Duration) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(ChannelCall::WaitVisible(selector.to_string()));
        Self::check_selector(&state, selector)
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let tag = script_tag(script).unwrap_or("untagged").to_string();
        let mut state = self.lock();
        state.calls.push(ChannelCall::Evaluate(tag.clone()));

        if state.failing_tags.contains(&tag) {
            return Err(ProspectorError::Channel(format!(
                "JavaScript evaluation failed: {}",
                tag
            )));
        }

        let value = match state.responses.get_mut(&tag) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Value::Null),
            Some(queue) => queue.front().cloned().unwrap_or(Value::Null),
            None => Value::Null,
        };
        Ok(value)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(ChannelCall::Click(selector.to_string()));
        Self::check_selector(&state, selector)
    }

    async fn fill(&self, selector: &str, _text: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(ChannelCall::Fill(selector.to_string()));
        Self::check_selector(&state, selector)
    }

    async fn sleep(&self, duration: Duration) {
        self.lock().calls.push(ChannelCall::Sleep(duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::tagged_script;
    use serde_json::json;

    #[tokio::test]
    async fn test_responses_pop_then_repeat_last() {
        let mock = MockChannel::new().with_responses("probe", [json!(true), json!(false)]);
        let script = tagged_script("probe", "1");

        assert_eq!(mock.evaluate(&script).await.unwrap(), json!(true));
        assert_eq!(mock.evaluate(&script).await.unwrap(), json!(false));
        assert_eq!(mock.evaluate(&script).await.unwrap(), json!(false));
        assert_eq!(mock.evaluations("probe"), 3);
    }

    #[tokio::test]
    async fn test_unknown_tag_is_null() {
        let mock = MockChannel::new();
        let value = mock.evaluate("document.title").await.unwrap();
        assert!(value.is_null());
        assert_eq!(mock.calls(), vec![ChannelCall::Evaluate("untagged".to_string())]);
    }

    #[tokio::test]
    async fn test_failures() {
        let mock = MockChannel::new()
            .failing_script("capture")
            .failing_selector("#missing")
            .failing_navigation("keywords=beta");

        assert!(mock.evaluate(&tagged_script("capture", "")).await.is_err());
        assert!(mock.click("#missing").await.is_err());
        assert!(mock.click("#present").await.is_ok());
        assert!(mock.navigate("https://x.example/?keywords=beta").await.is_err());
        assert!(mock.navigate("https://x.example/?keywords=alpha").await.is_ok());
        assert_eq!(mock.clicks(), vec!["#missing", "#present"]);
    }

    #[tokio::test]
    async fn test_sleep_is_recorded_not_slept() {
        let mock = MockChannel::new();
        mock.sleep(Duration::from_secs(3600)).await;
        mock.sleep(Duration::from_millis(500)).await;
        assert_eq!(mock.slept(), Duration::from_millis(3_600_500));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let mock = MockChannel::new();
        let handle = mock.clone();
        mock.navigate("https://x.example").await.unwrap();
        assert_eq!(handle.navigations(), vec!["https://x.example"]);
    }
}
