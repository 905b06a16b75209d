// 🔁 Transaction Fetcher - bounded retry against the aggregator with fallback
// fetch never fails: every path ends in a FetchOutcome, and dropping the
// future between attempts stops the loop

use crate::aggregator::{ProviderResponse, TransactionProvider, TransactionsGetRequest};
use crate::config::AggregatorConfig;
use crate::error::ProviderError;
use crate::fallback::{self, FallbackVariant};
use crate::models::{ResolvedRange, TransactionRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The one aggregator error code that is worth retrying
pub const PRODUCT_NOT_READY: &str = "PRODUCT_NOT_READY";

// ============================================================================
// RETRY POLICY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles after every retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Per-fetch loop state, dropped when the loop exits
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    delay: Duration,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        RetryState {
            attempt: 0,
            delay: policy.base_delay,
        }
    }

    fn has_attempts_left(&self, policy: &RetryPolicy) -> bool {
        self.attempt + 1 < policy.max_attempts
    }

    fn advance(&mut self) {
        self.attempt += 1;
        self.delay = self.delay.saturating_mul(2);
    }
}

/// How the fetcher waits between attempts
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Non-blocking wait on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Why live data could not be served
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// Aggregator answered with a non-retryable error code
    TerminalError { status: u16, error_code: Option<String> },
    /// Aggregator kept answering `PRODUCT_NOT_READY`
    RetriesExhausted { attempts: u32 },
    /// The call could not be completed
    Transport(String),
    /// The fetch task itself died before producing an outcome
    Aborted(String),
}

impl FallbackReason {
    /// Recognized-but-unsuccessful answers get the error marker; anything
    /// unrecognized gets the rich sample.
    pub fn variant(&self) -> FallbackVariant {
        match self {
            FallbackReason::TerminalError { .. } | FallbackReason::RetriesExhausted { .. } => {
                FallbackVariant::ErrorMarker
            }
            FallbackReason::Transport(_) | FallbackReason::Aborted(_) => FallbackVariant::RichSample,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Live(Vec<Value>),
    Fallback(FallbackReason),
}

impl FetchOutcome {
    /// Records to serve; never mixes live and fallback data
    pub fn into_records(self) -> Vec<TransactionRecord> {
        match self {
            FetchOutcome::Live(items) => items.into_iter().map(TransactionRecord::Live).collect(),
            FetchOutcome::Fallback(reason) => fallback::sample(reason.variant())
                .into_iter()
                .map(TransactionRecord::Sample)
                .collect(),
        }
    }
}

// ============================================================================
// FETCHER
// ============================================================================

pub struct TransactionFetcher {
    provider: Arc<dyn TransactionProvider>,
    pause: Arc<dyn Pause>,
    aggregator: AggregatorConfig,
    policy: RetryPolicy,
}

impl TransactionFetcher {
    pub fn new(provider: Arc<dyn TransactionProvider>, aggregator: AggregatorConfig, policy: RetryPolicy) -> Self {
        TransactionFetcher {
            provider,
            pause: Arc::new(TokioPause),
            aggregator,
            policy,
        }
    }

    /// Replace the wait strategy (tests use one that returns immediately)
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    pub async fn fetch(&self, range: &ResolvedRange, institution_id: &str) -> FetchOutcome {
        info!(
            start_date = %range.start,
            end_date = %range.end,
            institution_id,
            provider = self.provider.name(),
            "Fetching transactions"
        );

        match self.fetch_with_retry(range).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Transaction fetch failed, serving sample data");
                FetchOutcome::Fallback(FallbackReason::Transport(e.to_string()))
            }
        }
    }

    async fn fetch_with_retry(&self, range: &ResolvedRange) -> Result<FetchOutcome, ProviderError> {
        let request = TransactionsGetRequest::new(&self.aggregator, range);
        debug!(payload = %request.redacted(), "Aggregator request payload");

        let mut state = RetryState::new(&self.policy);

        loop {
            let response = self.provider.get_transactions(&request).await?;

            let (status, error_code, body) = match response {
                ProviderResponse::Success(body) => {
                    let items = live_transactions(body)?;
                    info!(attempt = state.attempt + 1, count = items.len(), "Received live transactions");
                    return Ok(FetchOutcome::Live(items));
                }
                ProviderResponse::Failure { status, error_code, body } => (status, error_code, body),
            };

            warn!(
                attempt = state.attempt + 1,
                status,
                error_code = error_code.as_deref().unwrap_or("<none>"),
                body = %body,
                "Aggregator returned an error"
            );

            if error_code.as_deref() != Some(PRODUCT_NOT_READY) {
                return Ok(FetchOutcome::Fallback(FallbackReason::TerminalError { status, error_code }));
            }

            if !state.has_attempts_left(&self.policy) {
                warn!(attempts = state.attempt + 1, "Transactions still not ready, giving up");
                return Ok(FetchOutcome::Fallback(FallbackReason::RetriesExhausted {
                    attempts: state.attempt + 1,
                }));
            }

            info!(delay_ms = state.delay.as_millis() as u64, "Transactions not ready, retrying");
            self.pause.pause(state.delay).await;
            state.advance();
        }
    }
}

/// `transactions` field of a success body; absent or null means none
fn live_transactions(body: Value) -> Result<Vec<Value>, ProviderError> {
    let Value::Object(mut fields) = body else {
        return Err(ProviderError::Malformed("success body is not a JSON object".to_string()));
    };

    match fields.remove("transactions") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ProviderError::Malformed(format!(
            "`transactions` is not an array: {}",
            other
        ))),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Step {
        Call,
        Pause(Duration),
    }

    /// Shared record of provider calls and waits, in order
    #[derive(Debug, Clone, Default)]
    pub struct Timeline(Arc<Mutex<Vec<Step>>>);

    impl Timeline {
        pub fn push(&self, step: Step) {
            self.0.lock().unwrap().push(step);
        }

        pub fn steps(&self) -> Vec<Step> {
            self.0.lock().unwrap().clone()
        }

        pub fn calls(&self) -> usize {
            self.steps().iter().filter(|s| **s == Step::Call).count()
        }
    }

    /// Provider that replays a fixed script of answers
    pub struct ScriptedProvider {
        script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
        timeline: Timeline,
    }

    impl ScriptedProvider {
        pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>, timeline: Timeline) -> Self {
            ScriptedProvider {
                script: Mutex::new(script.into()),
                timeline,
            }
        }
    }

    #[async_trait]
    impl TransactionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn get_transactions(&self, _request: &TransactionsGetRequest) -> Result<ProviderResponse, ProviderError> {
            self.timeline.push(Step::Call);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Network("script exhausted".to_string())))
        }
    }

    /// Records the requested wait and returns immediately
    pub struct RecordingPause(pub Timeline);

    #[async_trait]
    impl Pause for RecordingPause {
        async fn pause(&self, delay: Duration) {
            self.0.push(Step::Pause(delay));
        }
    }

    pub fn not_ready() -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse::Failure {
            status: 400,
            error_code: Some(PRODUCT_NOT_READY.to_string()),
            body: serde_json::json!({"error_code": PRODUCT_NOT_READY, "error_type": "ITEM_ERROR"}),
        })
    }

    pub fn aggregator_config() -> AggregatorConfig {
        AggregatorConfig {
            base_url: "http://plaid.test".to_string(),
            client_id: "client".to_string(),
            secret: "secret".to_string(),
            access_token: "access-sandbox".to_string(),
        }
    }

    pub fn scripted_fetcher(script: Vec<Result<ProviderResponse, ProviderError>>) -> (TransactionFetcher, Timeline) {
        let timeline = Timeline::default();
        let provider = Arc::new(ScriptedProvider::new(script, timeline.clone()));
        let fetcher = TransactionFetcher::new(provider, aggregator_config(), RetryPolicy::default())
            .with_pause(Arc::new(RecordingPause(timeline.clone())));
        (fetcher, timeline)
    }
}
