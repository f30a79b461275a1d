//! The browser control channel abstraction

use async_trait::async_trait;
use prospector_core::Result;
use std::time::Duration;

const TAG_PREFIX: &str = "/*prospector:";
const TAG_SUFFIX: &str = "*/";

/// Trait for driving one browser tab (allows mocking in tests)
///
/// A channel belongs to exactly one run. Implementations are not expected to
/// tolerate interleaved use from two workflows.
#[async_trait]
pub trait BrowserChannel: Send + Sync {
    /// Load a URL and wait for navigation to settle
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until an element matching `selector` is present
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Run a script in the page and return its value
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str) -> Result<()>;

    /// Type `text` into the first element matching `selector`
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    /// Pause the workflow
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Prefix a script body with a `/*prospector:<tag>*/` marker
pub fn tagged_script(tag: &str, body: &str) -> String {
    format!("{TAG_PREFIX}{tag}{TAG_SUFFIX}\n{body}")
}

/// Read the marker written by [`tagged_script`]
pub fn script_tag(script: &str) -> Option<&str> {
    script
        .trim_start()
        .strip_prefix(TAG_PREFIX)
        .and_then(|rest| rest.split_once(TAG_SUFFIX))
        .map(|(tag, _)| tag.trim())
        .filter(|tag| !tag.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        let script = tagged_script("capture", "(() => 1)()");
        assert!(script.starts_with("/*prospector:capture*/"));
        assert_eq!(script_tag(&script), Some("capture"));
    }

    #[test]
    fn test_untagged_script() {
        assert_eq!(script_tag("document.title"), None);
        assert_eq!(script_tag("/* plain comment */ 1"), None);
        assert_eq!(script_tag("/*prospector:*/ 1"), None);
    }
}
