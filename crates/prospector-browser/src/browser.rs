//! Browser lifecycle management using Chrome DevTools Protocol

use crate::channel::BrowserChannel;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use prospector_core::{ProspectorError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Idle timeout of the DevTools connection in seconds
    pub idle_timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            idle_timeout_seconds: 600,
        }
    }
}

/// Ask the DevTools HTTP endpoint on `port` for the browser websocket URL
async fn discover_debugger_url(port: u16) -> Result<String> {
    let endpoint = format!("http://127.0.0.1:{}/json/version", port);
    let body: serde_json::Value = reqwest::get(&endpoint)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| ProspectorError::Channel(format!("Failed to query {}: {}", endpoint, e)))?
        .json()
        .await
        .map_err(|e| {
            ProspectorError::Channel(format!("Invalid response from {}: {}", endpoint, e))
        })?;
    debugger_url_from_version(&body)
}

/// Extract `webSocketDebuggerUrl` from a `/json/version` response
fn debugger_url_from_version(body: &serde_json::Value) -> Result<String> {
    body.get("webSocketDebuggerUrl")
        .and_then(|url| url.as_str())
        .filter(|url| url.starts_with("ws://") || url.starts_with("wss://"))
        .map(str::to_string)
        .ok_or_else(|| {
            ProspectorError::Channel(
                "DevTools endpoint did not report a webSocketDebuggerUrl".to_string(),
            )
        })
}

/// Active browser session with Chrome DevTools Protocol
///
/// The session owns its browser process. Dropping it closes the browser, which
/// is also the only way to stop an in-flight run.
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
}

impl BrowserSession {
    /// Launch browser with custom configuration
    pub async fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .build()
            .map_err(|e| ProspectorError::Channel(format!("Invalid launch options: {}", e)))?;

        let (browser, tab) = tokio::task::spawn_blocking(move || {
            let browser = Browser::new(launch_options)
                .map_err(|e| ProspectorError::Channel(format!("Failed to launch browser: {}", e)))?;
            let tab = browser
                .new_tab()
                .map_err(|e| ProspectorError::Channel(format!("Failed to create tab: {}", e)))?;
            Ok::<_, ProspectorError>((browser, tab))
        })
        .await
        .map_err(|e| ProspectorError::Channel(format!("Browser launch task failed: {}", e)))??;

        info!("Browser launched successfully");
        Ok(Self { browser, tab })
    }

    /// Connect to an existing browser instance
    ///
    /// # Arguments
    /// * `port` - Chrome DevTools Protocol port (typically 9222)
    pub async fn connect(port: u16) -> Result<Self> {
        info!("Connecting to existing browser on port {}", port);

        let ws_url = discover_debugger_url(port).await?;
        debug!("DevTools websocket: {}", ws_url);

        let (browser, tab) = tokio::task::spawn_blocking(move || {
            let browser = Browser::connect(ws_url).map_err(|e| {
                ProspectorError::Channel(format!("Failed to connect to browser: {}", e))
            })?;
            let tab = browser
                .new_tab()
                .map_err(|e| ProspectorError::Channel(format!("Failed to create tab: {}", e)))?;
            Ok::<_, ProspectorError>((browser, tab))
        })
        .await
        .map_err(|e| ProspectorError::Channel(format!("Browser connect task failed: {}", e)))??;

        info!("Connected to browser successfully");
        Ok(Self { browser, tab })
    }

    /// Run a blocking CDP call against the tab off the async executor
    async fn with_tab<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab))
            .await
            .map_err(|e| ProspectorError::Channel(format!("Browser task failed: {}", e)))?
    }
}

#[async_trait]
impl BrowserChannel for BrowserSession {
    #[instrument(skip(self))]
    async fn navigate(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.navigate_to(&url).map_err(|e| {
                ProspectorError::Channel(format!("Failed to navigate to {}: {}", url, e))
            })?;
            tab.wait_until_navigated().map_err(|e| {
                ProspectorError::Channel(format!("Navigation timeout for {}: {}", url, e))
            })?;
            Ok(())
        })
        .await?;

        debug!("Navigation complete");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .map(|_| ())
                .map_err(|_| ProspectorError::Channel(format!("Element not found: {}", selector)))
        })
        .await
    }

    #[instrument(skip_all)]
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let script = script.to_string();
        self.with_tab(move |tab| {
            let result = tab.evaluate(&script, false).map_err(|e| {
                ProspectorError::Channel(format!("JavaScript evaluation failed: {}", e))
            })?;
            Ok(result.value.unwrap_or(serde_json::Value::Null))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn click(&self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|_| ProspectorError::Channel(format!("Element not found: {}", selector)))?;
            element
                .click()
                .map_err(|e| ProspectorError::Channel(format!("Click on {} failed: {}", selector, e)))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, text))]
    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|_| ProspectorError::Channel(format!("Element not found: {}", selector)))?;
            element
                .type_into(&text)
                .map_err(|e| ProspectorError::Channel(format!("Typing into {} failed: {}", selector, e)))?;
            Ok(())
        })
        .await
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.window_width, 1920);
        assert_eq!(config.window_height, 1080);
        assert_eq!(config.idle_timeout_seconds, 600);
    }

    #[test]
    fn test_headed_config() {
        let config = BrowserConfig {
            headless: false,
            ..BrowserConfig::default()
        };
        assert!(!config.headless);
        assert_eq!(config.window_width, 1920);
    }

    #[test]
    fn test_debugger_url_from_version() {
        let body = serde_json::json!({
            "Browser": "Chrome/120.0.6099.109",
            "Protocol-Version": "1.3",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/5c1f0e7a"
        });
        assert_eq!(
            debugger_url_from_version(&body).unwrap(),
            "ws://127.0.0.1:9222/devtools/browser/5c1f0e7a"
        );
    }

    #[test]
    fn test_debugger_url_missing_or_not_websocket() {
        let missing = serde_json::json!({ "Browser": "Chrome/120" });
        assert!(matches!(
            debugger_url_from_version(&missing),
            Err(ProspectorError::Channel(_))
        ));

        let http = serde_json::json!({ "webSocketDebuggerUrl": "http://127.0.0.1:9222" });
        assert!(debugger_url_from_version(&http).is_err());
    }

    #[tokio::test]
    async fn test_discover_without_listener_is_channel_error() {
        // Nothing listens on port 1
        let result = discover_debugger_url(1).await;
        assert!(matches!(result, Err(ProspectorError::Channel(_))));
    }
}
