//! # Retrying fetch.
//!
//! [`fetch_retry`] keeps re-sending one HTTP request until it completes without
//! a network-level failure. It is the readiness probe for freshly launched
//! containers: connection refused means "not up yet", any HTTP response means
//! "up".
//!
//! ## Rules
//! - Connect, timeout and transport errors are retried after [`BackoffPolicy::next`]
//! - An HTTP error status is **not** retried; the response is returned as-is
//! - Any other error (bad URL, redirect loop, ...) is returned immediately
//! - The optional token aborts both an in-flight attempt and the wait between attempts

mod backoff;

use std::future::pending;

use reqwest::{Client, Request, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FetchError;
use crate::time::{millis, sleep};

pub use backoff::{BackoffPolicy, JitterPolicy};

/// Sends `request` until it gets any HTTP response.
///
/// The request body must be replayable ([`Request::try_clone`]); streaming
/// bodies yield [`FetchError::NotCloneable`].
pub async fn fetch_retry(
    client: &Client,
    request: Request,
    backoff: &BackoffPolicy,
    cancel: Option<&CancellationToken>,
) -> Result<Response, FetchError> {
    let mut attempt: u32 = 0;
    loop {
        let req = request.try_clone().ok_or(FetchError::NotCloneable)?;
        let res = tokio::select! {
            biased;
            _ = cancelled(cancel) => return Err(FetchError::Canceled),
            res = client.execute(req) => res,
        };

        match res {
            Ok(resp) => return Ok(resp),
            Err(e) if is_network_failure(&e) => {
                let delay = backoff.next(attempt);
                debug!(
                    url = %request.url(),
                    attempt,
                    delay_ms = millis(delay),
                    error = %e,
                    "fetch failed, retrying"
                );
                if sleep(delay, cancel).await.is_cancelled() {
                    return Err(FetchError::Canceled);
                }
                attempt = attempt.saturating_add(1);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn is_network_failure(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request()
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn quick() -> BackoffPolicy {
        BackoffPolicy::constant(Duration::from_millis(50))
    }

    async fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Answers every connection with `status` and counts them.
    async fn serve(listener: TcpListener, status: &'static str, hits: Arc<AtomicUsize>) {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            hits.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok"
            );
            let _ = sock.write_all(reply.as_bytes()).await;
            let _ = sock.shutdown().await;
        }
    }

    fn get(client: &Client, port: u16) -> Request {
        client
            .get(format!("http://127.0.0.1:{port}/"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn retries_until_the_server_comes_up() {
        let port = free_port().await;
        let client = Client::new();
        let fetch = tokio::spawn({
            let client = client.clone();
            let req = get(&client, port);
            async move { fetch_retry(&client, req, &quick(), None).await }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        tokio::spawn(serve(listener, "200 OK", hits.clone()));

        let resp = tokio::time::timeout(Duration::from_secs(5), fetch)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn error_status_is_returned_without_retry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));
        tokio::spawn(serve(listener, "503 Service Unavailable", hits.clone()));

        let client = Client::new();
        let resp = fetch_retry(&client, get(&client, port), &quick(), None)
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_retrying() {
        let port = free_port().await;
        let client = Client::new();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            trigger.cancel();
        });

        let err = fetch_retry(&client, get(&client, port), &quick(), Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Canceled));
    }

    #[tokio::test]
    async fn invalid_scheme_is_not_retried() {
        let client = Client::new();
        let req = client.get("ftp://127.0.0.1/").build().unwrap();
        let err = fetch_retry(&client, req, &quick(), None).await.unwrap_err();
        assert_eq!(err.as_label(), "fetch_request");
    }
}
