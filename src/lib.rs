// Emotion Agent - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod config;
pub mod models;
pub mod dates;          // Date Range Resolver
pub mod fallback;       // Fallback Data Provider
pub mod aggregator;     // Plaid transactions/get client
pub mod fetcher;        // Retry/backoff state machine
pub mod service;        // Request Handler for /fetchTransaction
pub mod llm;            // DeepSeek chat completions
pub mod assistant;      // Financial assistant prompt

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use error::{ConfigError, DateField, LlmError, ProviderError, ValidationError};
pub use config::{AggregatorConfig, Config, LlmConfig};
pub use models::{
    ResolvedRange, Transaction, TransactionQuery, TransactionRecord, TransactionsResponse,
    DEFAULT_INSTITUTION_ID,
};
pub use fallback::FallbackVariant;
pub use aggregator::{PlaidClient, ProviderResponse, TransactionProvider, TransactionsGetRequest};
pub use fetcher::{
    FallbackReason, FetchOutcome, Pause, RetryPolicy, TokioPause, TransactionFetcher, PRODUCT_NOT_READY,
};
pub use service::TransactionService;
pub use llm::{ChatCompletionRequest, ChatMessage, ChatProvider, DeepSeekClient};
pub use assistant::{AssistantInput, AssistantResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the `tracing` subscriber used by both binaries.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,emotion_agent=debug"));

    // a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
