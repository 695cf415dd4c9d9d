//! Retry-until-expected-status
//!
//! Services under test are eventually consistent (an index may not be
//! searchable right after creation), so a step can ask for a few extra
//! attempts before a status mismatch becomes a failure.

use std::future::Future;
use std::time::Duration;

use crate::common::{Error, Result};
use crate::http::HttpResponse;

/// Issue a request until it returns `expected_status`, at most `num_retries + 1` times
///
/// `expected_status == None` accepts the first response whatever its status.
/// Transport errors are not retried.
pub async fn send_with_retry<F, Fut>(
    mut send: F,
    expected_status: Option<u16>,
    num_retries: u32,
    wait: Duration,
    url: &str,
) -> Result<HttpResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<HttpResponse>>,
{
    let mut attempt = 0;
    loop {
        let response = send().await?;
        let expected = match expected_status {
            None => return Ok(response),
            Some(expected) if response.status == expected => return Ok(response),
            Some(expected) => expected,
        };

        tracing::info!(
            url,
            status = response.status,
            expected,
            body = %response.body,
            "Unexpected status code"
        );
        if attempt >= num_retries {
            return Err(Error::UnexpectedStatus {
                actual: response.status,
                expected,
                url: url.to_string(),
            });
        }
        attempt += 1;
        tracing::info!(attempt, num_retries, "Retrying...");
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn scripted(statuses: &[u16]) -> (Cell<usize>, Vec<u16>) {
        (Cell::new(0), statuses.to_vec())
    }

    #[tokio::test]
    async fn test_succeeds_after_retries() {
        let (calls, statuses) = scripted(&[500, 500, 200]);
        let response = send_with_retry(
            || {
                let n = calls.get();
                calls.set(n + 1);
                let status = statuses[n.min(statuses.len() - 1)];
                async move { Ok(HttpResponse::new(status, "{}")) }
            },
            Some(200),
            2,
            Duration::ZERO,
            "http://localhost/x",
        )
        .await
        .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_num_retries_plus_one() {
        let calls = Cell::new(0);
        let err = send_with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Ok(HttpResponse::new(500, "boom")) }
            },
            Some(200),
            2,
            Duration::ZERO,
            "http://localhost/x",
        )
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 3);
        match err {
            Error::UnexpectedStatus {
                actual,
                expected,
                url,
            } => {
                assert_eq!(actual, 500);
                assert_eq!(expected, 200);
                assert_eq!(url, "http://localhost/x");
            }
            other => panic!("Expected UnexpectedStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_expected_status_accepts_anything() {
        let calls = Cell::new(0);
        let response = send_with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Ok(HttpResponse::new(404, "{}")) }
            },
            None,
            5,
            Duration::ZERO,
            "u",
        )
        .await
        .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let calls = Cell::new(0);
        let result = send_with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Ok(HttpResponse::new(400, "{}")) }
            },
            Some(200),
            0,
            Duration::ZERO,
            "u",
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
