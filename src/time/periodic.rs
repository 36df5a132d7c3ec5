//! # Periodic task runner.
//!
//! ```text
//! loop {
//!   ├─► token cancelled? ──► return Ok
//!   ├─► action().await?  ──► Err propagates, loop ends (no retry)
//!   └─► sleep(interval, token) ──► Cancelled ──► return Ok
//! }
//! ```
//!
//! ## Rules
//! - The action runs **at least once** unless the token already fired at call time
//! - No iteration **starts** after cancellation; an in-flight action is not interrupted
//! - Nothing stays registered on the token after return (the sleep owns its wait)

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::sleep::sleep;

/// Runs `action` every `interval` until `cancel` fires or the action fails.
///
/// Synchronous actions can be passed as `|| std::future::ready(Ok(()))`.
/// Without a token the loop only ends on the first error.
pub async fn periodically<F, Fut, E>(
    mut action: F,
    interval: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<(), E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Ok(());
        }
        action().await?;
        if sleep(interval, cancel).await.is_cancelled() {
            return Ok(());
        }
    }
}
