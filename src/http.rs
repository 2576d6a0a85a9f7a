use std::io::Read;
use std::thread;
use std::time::Duration;

use thiserror::Error;

// Largest blob accepted for cached images.
const MAX_BLOB_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP status {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response decode failed: {0}")]
    Decode(String),
    #[error("request failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: Box<HttpError>,
    },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub attempts: usize,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(8),
            attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Request<'a> {
    pub url: &'a str,
    pub headers: Vec<(&'a str, String)>,
    pub query: Vec<(String, String)>,
}

impl<'a> Request<'a> {
    pub fn get(url: &'a str) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub fn get_text_with_retries(
    request: &Request<'_>,
    policy: &RetryPolicy,
) -> Result<String, HttpError> {
    get_with_retries(request, policy, |response| {
        response
            .into_string()
            .map_err(|err| HttpError::Decode(err.to_string()))
    })
}

pub fn get_bytes_with_retries(
    request: &Request<'_>,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, HttpError> {
    get_with_retries(request, policy, |response| {
        read_capped(response.into_reader(), MAX_BLOB_BYTES)
    })
}

/// Reads the whole body, failing instead of truncating past `limit` bytes.
fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|err| HttpError::Decode(err.to_string()))?;
    if body.len() as u64 > limit {
        return Err(HttpError::Decode(format!(
            "body exceeds {} MiB",
            limit / (1024 * 1024)
        )));
    }
    Ok(body)
}

fn get_with_retries<T>(
    request: &Request<'_>,
    policy: &RetryPolicy,
    read_body: impl Fn(ureq::Response) -> Result<T, HttpError>,
) -> Result<T, HttpError> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    let mut last_error = None;
    for attempt in 1..=attempts {
        let mut call = agent.get(request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        for (key, value) in &request.query {
            call = call.query(key, value);
        }

        tracing::debug!(url = request.url, attempt, "GET");
        let error = match call.call() {
            Ok(response) => return read_body(response),
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body.trim().chars().take(240).collect::<String>();
                let error = HttpError::Status { status, body };
                if !should_retry_http_status(status) {
                    return Err(error);
                }
                error
            }
            Err(ureq::Error::Transport(err)) => HttpError::Transport(err.to_string()),
        };

        tracing::warn!(url = request.url, attempt, %error, "request attempt failed");
        last_error = Some(error);
        if attempt < attempts {
            thread::sleep(policy.retry_delay);
        }
    }

    let last = last_error.unwrap_or_else(|| {
        HttpError::Transport("exhausted attempts without a concrete error".to_string())
    });
    Err(HttpError::Exhausted {
        attempts,
        last: Box::new(last),
    })
}
