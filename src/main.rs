// Emotion Agent - CLI
// One-shot fetch, suggest and fallback commands without the server

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use emotion_agent::{
    assistant, fallback, AssistantInput, Config, DeepSeekClient, FallbackVariant, PlaidClient,
    TransactionFetcher, TransactionQuery, TransactionService,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "emotion-agent", about = "Emotion Agent CLI: transactions and spending suggestions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch transactions for a date range (live, or fallback data on failure).
    Fetch {
        /// Institution id.
        #[arg(long, default_value = "ins_1")]
        institution: String,

        /// Start date (YYYY-MM-DD). Defaults to 30 days ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Ask the financial assistant for a suggestion.
    Suggest {
        /// How the user feels right now.
        #[arg(long, default_value = "neutral")]
        emotion: String,

        /// Recent purchases, free text.
        #[arg(long, default_value = "")]
        purchases: String,
    },
    /// Print the built-in fallback transactions.
    Fallback {
        #[arg(long, value_enum, default_value_t = Variant::Rich)]
        variant: Variant,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    Rich,
    Error,
}

#[tokio::main]
async fn main() -> Result<()> {
    emotion_agent::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { institution, start, end } => run_fetch(institution, start, end).await,
        Commands::Suggest { emotion, purchases } => run_suggest(emotion, purchases).await,
        Commands::Fallback { variant } => run_fallback(variant),
    }
}

async fn run_fetch(institution: String, start: Option<String>, end: Option<String>) -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    let plaid = PlaidClient::new(&config.aggregator, config.http_timeout)?;
    let fetcher = TransactionFetcher::new(Arc::new(plaid), config.aggregator.clone(), config.retry);
    let service = TransactionService::new(fetcher);

    let query = TransactionQuery::new(Some(institution), start, end);
    let response = service.handle(&query).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_suggest(emotion: String, purchases: String) -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    let chat = DeepSeekClient::new(&config.llm, config.http_timeout)?;

    let input = AssistantInput {
        emotion,
        purchase_history: purchases,
    };
    let response = assistant::suggest(&chat, &input)
        .await
        .context("Financial assistant failed")?;

    println!("{}", response.financial_suggestion);
    Ok(())
}

fn run_fallback(variant: Variant) -> Result<()> {
    let variant = match variant {
        Variant::Rich => FallbackVariant::RichSample,
        Variant::Error => FallbackVariant::ErrorMarker,
    };

    println!("{}", serde_json::to_string_pretty(&fallback::sample(variant))?);
    Ok(())
}
