//! Preflight reachability checks for the target sites

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Wait until `url` answers with anything other than a server error
pub async fn wait_for_reachable(url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("{} is reachable ({})", url, resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Preflight {} returned {}", url, resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {}...", url);
                }
                if !e.is_connect() && !e.is_timeout() {
                    warn!("Preflight error for {}: {}", url, e);
                }
            }
        }

        sleep(Duration::from_millis(500)).await;
    }

    Err(E2eError::Unreachable {
        url: url.to_string(),
        attempts,
    })
}

/// Check every URL in turn, failing on the first unreachable one
pub async fn check_all(urls: &[String], timeout_duration: Duration) -> E2eResult<()> {
    for url in urls {
        wait_for_reachable(url, timeout_duration).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_reports_attempts() {
        // Port 9 (discard) on localhost is closed on any sane test host
        let err = wait_for_reachable("http://127.0.0.1:9/", Duration::from_millis(200))
            .await
            .unwrap_err();
        match err {
            E2eError::Unreachable { url, attempts } => {
                assert_eq!(url, "http://127.0.0.1:9/");
                assert!(attempts >= 1);
            }
            other => panic!("expected Unreachable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_list_passes() {
        check_all(&[], Duration::from_millis(10)).await.unwrap();
    }
}
