use super::circuit::{CircuitBreaker, CircuitState};
use super::endpoint::{BLUEPRINTS_PATH, FEEDBACK_PATH, normalize_endpoint};
use super::transport::{HttpReply, HttpTransport, ReqwestTransport};
use crate::config::RemoteConfig;
use crate::error::{ClarifyError, Result};
use crate::protocol::{
    Directive, FeedbackRecord, StructuralRequest, parse_directive, validate_feedback,
    validate_request,
};
use crate::providers::scrub::sanitize_api_error;
use crate::providers::traits::DirectiveProvider;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Remote directive provider with timeout, retry, circuit breaking and
/// credential redaction.
///
/// Every error leaving this type has the configured credential scrubbed from
/// its message, whatever layer produced it.
pub struct RemoteProvider {
    endpoint: String,
    credential: String,
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
    breaker: CircuitBreaker,
    transport: Box<dyn HttpTransport>,
}

impl RemoteProvider {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Self::with_transport(config, Box::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: &RemoteConfig, transport: Box<dyn HttpTransport>) -> Result<Self> {
        let (endpoint, credential) = config.require_credentials()?;
        let credential = credential.to_string();
        let endpoint = normalize_endpoint(endpoint).map_err(|e| e.redact(&credential))?;
        config.validate()?;

        Ok(Self {
            endpoint,
            credential,
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_retry_delay_ms),
            breaker: CircuitBreaker::new(
                config.circuit_breaker_threshold,
                Duration::from_millis(config.circuit_breaker_reset_ms),
            ),
            transport,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.breaker.consecutive_failures()
    }

    /// Close the breaker and zero its failure count.
    pub fn reset_circuit(&self) {
        self.breaker.reset();
    }

    /// One network attempt under the per-call timeout, classified by status.
    async fn attempt(&self, url: &str, body: &serde_json::Value) -> Result<String> {
        let reply = tokio::time::timeout(
            self.timeout,
            self.transport.post_json(url, &self.credential, body),
        )
        .await
        .map_err(|_| ClarifyError::Timeout {
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        })??;

        self.classify(reply)
    }

    fn classify(&self, reply: HttpReply) -> Result<String> {
        let HttpReply { status, body } = reply;
        if (200..300).contains(&status) {
            return Ok(body);
        }

        let message = sanitize_api_error(&body, &self.credential);
        match status {
            401 | 403 => Err(ClarifyError::Authentication(format!(
                "service responded {status}: {message}"
            ))),
            _ => Err(ClarifyError::Service { status, message }),
        }
    }

    /// Retry loop around [`attempt`](Self::attempt).
    ///
    /// Attempt `k` (1-based) that fails transiently waits `base * 2^(k-1)`
    /// before the next try. Terminal failures return immediately, as does a
    /// failure that leaves the circuit open; the caller then sees that
    /// failure rather than a later `CircuitOpen`.
    async fn call(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let url = format!("{}{path}", self.endpoint);
        let mut delay = self.base_delay;
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let permit = self.breaker.try_acquire()?;

            match self.attempt(&url, body).await {
                Ok(text) => {
                    permit.succeed();
                    if attempt > 0 {
                        tracing::info!(path, attempt, "Remote call recovered after retries");
                    }
                    return Ok(text);
                }
                Err(err) => {
                    if err.trips_breaker() {
                        permit.fail();
                    } else {
                        // The service answered; it is reachable.
                        permit.succeed();
                    }

                    if !err.is_retryable() {
                        tracing::warn!(
                            path,
                            error = %err.redacted_message(&self.credential),
                            "Non-retryable remote failure"
                        );
                        return Err(err);
                    }

                    if self.breaker.state() == CircuitState::Open {
                        tracing::warn!(
                            path,
                            attempt = attempt + 1,
                            "Circuit open, abandoning remaining retries"
                        );
                        return Err(err);
                    }

                    if attempt < self.max_retries {
                        tracing::warn!(
                            path,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Remote call failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        delay = delay.saturating_mul(2);
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ClarifyError::Protocol("retry loop finished without an attempt".into())
        }))
    }

    async fn fetch(&self, request: &StructuralRequest) -> Result<Directive> {
        validate_request(request)?;
        let body = serde_json::to_value(request)
            .map_err(|e| ClarifyError::Validation(format!("request not serializable: {e}")))?;

        let text = self.call(BLUEPRINTS_PATH, &body).await?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ClarifyError::Validation(format!("malformed directive: {e}")))?;
        parse_directive(value)
    }

    async fn feedback(&self, record: &FeedbackRecord) -> Result<()> {
        validate_feedback(record)?;
        let body = serde_json::to_value(record)
            .map_err(|e| ClarifyError::Validation(format!("feedback not serializable: {e}")))?;
        self.call(FEEDBACK_PATH, &body).await.map(|_| ())
    }
}

impl DirectiveProvider for RemoteProvider {
    fn name(&self) -> &str {
        "remote"
    }

    fn fetch_directive<'a>(
        &'a self,
        request: &'a StructuralRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Directive>> + Send + 'a>> {
        Box::pin(async move {
            self.fetch(request)
                .await
                .map_err(|e| e.redact(&self.credential))
        })
    }

    fn send_feedback<'a>(
        &'a self,
        record: &'a FeedbackRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.feedback(record)
                .await
                .map_err(|e| e.redact(&self.credential))
        })
    }
}
