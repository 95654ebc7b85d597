use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::ZooError;

const MAX_RETRIES: usize = 3;
const BASE_DELAY_MS: u64 = 200;

pub fn user_agent() -> String {
    format!("dataset-zoo/{}", env!("CARGO_PKG_VERSION"))
}

pub fn build_client(timeout: Duration) -> Result<Client, ZooError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent()).map_err(|err| ZooError::Download(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| ZooError::Download(err.to_string()))
}

pub fn send_with_retries<F>(mut make_req: F) -> Result<Response, ZooError>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 0usize;
    loop {
        match make_req().send() {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if attempt < MAX_RETRIES && is_retryable_status(status) {
                    tracing::debug!(status, attempt, "retrying request");
                    backoff(attempt);
                    attempt += 1;
                    continue;
                }
                return Ok(resp);
            }
            Err(err) => {
                if attempt < MAX_RETRIES && is_retryable_error(&err) {
                    tracing::debug!(error = %err, attempt, "retrying request");
                    backoff(attempt);
                    attempt += 1;
                    continue;
                }
                return Err(ZooError::Download(err.to_string()));
            }
        }
    }
}

pub fn ensure_success(response: Response) -> Result<Response, ZooError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "download request failed".to_string());
    Err(ZooError::DownloadStatus { status, message })
}

fn backoff(attempt: usize) {
    let delay = BASE_DELAY_MS * (attempt as u64 + 1);
    thread::sleep(Duration::from_millis(delay));
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }
}
