//! Cooperative cancellation helpers.
//!
//! Every engine call and every sleep is raced against the caller's
//! [`CancellationToken`] so that a cancelled request stops at its next
//! suspension point.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::errors::EngineError;

/// Run `future` unless `ctx` is cancelled first.
///
/// An already-cancelled token wins over a future that is immediately ready.
pub async fn with_cancellation<F, T>(ctx: &CancellationToken, future: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(EngineError::Cancelled),
        result = future => result,
    }
}

/// Sleep for `duration`, returning early with an error if `ctx` is cancelled.
pub async fn cancellable_sleep(ctx: &CancellationToken, duration: Duration) -> Result<(), EngineError> {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(EngineError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
