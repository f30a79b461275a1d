//! Fail-open helper for steps whose failure must not stop a run
//!
//! Appropriate for scroll pulses, window concealment and similar cosmetic
//! browser steps. Never use it for authentication or invite recording.

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
/// There is no retry.
///
/// ```no_run
/// use prospector_core::fail_open::fail_open;
/// use prospector_core::Result;
///
/// async fn scroll() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let scrolled = fail_open("scroll_pulse", || scroll()).await;
///     assert!(scrolled.is_some());
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProspectorError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, ProspectorError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(ProspectorError::Channel("scroll failed".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_fail_open_runs_once() {
        let mut attempts = 0;
        let result = fail_open("test_op", || {
            attempts += 1;
            async { Err::<(), _>(ProspectorError::Other("boom".to_string())) }
        })
        .await;
        assert!(result.is_none());
        assert_eq!(attempts, 1);
    }
}
