//! Bounded waits on collaborator calls

use crate::config::millis;
use crate::types::SettlementError;
use std::future::Future;
use std::time::Duration;

/// Await `call`, failing with [`SettlementError::Timeout`] once `limit` elapses
pub async fn bounded<T, Fut>(
    operation: &str,
    limit: Duration,
    call: Fut,
) -> Result<T, SettlementError>
where
    Fut: Future<Output = Result<T, SettlementError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            let limit_ms = millis(limit);
            tracing::error!(operation, limit_ms, "collaborator call timed out");
            Err(SettlementError::timeout(operation, limit_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_call_times_out() {
        let result: Result<(), _> = bounded("find_seller", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(SettlementError::timeout("find_seller", 50)));
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let result = bounded("find_seller", Duration::from_secs(1), async { Ok(3) }).await;
        assert_eq!(result, Ok(3));
    }
}
