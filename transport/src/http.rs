use std::time::{Duration, Instant};

use ilp_common::config::{SenderConfig, TlsVerify};
use ilp_common::{CResult, Error};
use rand::Rng;
use reqwest::blocking::Client;

use crate::Transport;

/// HTTP status codes worth retrying: 5xx server errors QuestDB itself
/// raises for transient overload/maintenance conditions (spec.md §5.1).
const RETRYABLE_STATUS: &[u16] = &[500, 503, 504, 507, 509, 523, 524, 529, 599];

const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Sends drained buffer bytes as the body of a `POST /write`, retrying
/// transient failures with jittered exponential backoff until
/// `retry_timeout` elapses.
pub struct HttpTransport {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
    request_min_throughput: u64,
    request_timeout: Duration,
    retry_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &SenderConfig) -> CResult<Self> {
        let scheme = if config.protocol.is_tls() { "https" } else { "http" };
        let url = format!("{scheme}://{}:{}/write?precision=n", config.host, config.port);

        let mut builder = Client::builder();
        if config.protocol.is_tls() && config.tls_verify == TlsVerify::UnsafeOff {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(ca) = &config.tls_ca {
            let pem = std::fs::read(ca)?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| Error::configuration(format!("invalid tls_ca: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(Error::Http)?;

        Ok(HttpTransport {
            client,
            url,
            username: config.username.clone(),
            password: config.password.clone(),
            token: config.token.clone(),
            request_min_throughput: config.request_min_throughput,
            request_timeout: Duration::from_millis(config.request_timeout_millis),
            retry_timeout: Duration::from_millis(config.retry_timeout_millis),
        })
    }

    /// Base request timeout plus a component proportional to body size, so
    /// large flushes aren't held to the same deadline as small ones.
    fn timeout_for(&self, body_len: usize) -> Duration {
        let throughput_component = if self.request_min_throughput > 0 {
            Duration::from_secs_f64(body_len as f64 / self.request_min_throughput as f64)
        } else {
            Duration::ZERO
        };
        self.request_timeout + throughput_component
    }

    fn attempt(&self, bytes: &[u8]) -> Result<(), Error> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout_for(bytes.len()))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(bytes.to_vec());

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        } else if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.clone());
        }

        let response = request.send().map_err(classify_send_error)?;
        let status = response.status();
        if status.is_success() {
            if status.as_u16() == 204 {
                let body = response.text().unwrap_or_default();
                if !body.is_empty() {
                    tracing::warn!(body, "server returned 204 with a non-empty body");
                }
            }
            return Ok(());
        }

        let retriable = RETRYABLE_STATUS.contains(&status.as_u16());
        let body = response.text().unwrap_or_default();
        Err(Error::transport(retriable, format!("server responded {status}: {body}")))
    }
}

fn classify_send_error(err: reqwest::Error) -> Error {
    let retriable = err.is_timeout() || err.is_connect();
    Error::transport(retriable, err.to_string())
}

impl Transport for HttpTransport {
    fn send(&mut self, bytes: &[u8]) -> CResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let deadline = Instant::now() + self.retry_timeout;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match self.attempt(bytes) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retriable() && Instant::now() < deadline => {
                    tracing::warn!(error = %err, "retrying ilp http write");
                    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..5));
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    std::thread::sleep((backoff + jitter).min(remaining));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn close(&mut self) -> CResult<()> {
        Ok(())
    }
}
