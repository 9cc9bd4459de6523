pub mod agent;
pub mod cli;
pub mod config;
pub mod interest;
pub mod logging;
pub mod model;
pub mod model_gateway;
pub mod providers;
pub mod repl;
pub mod report;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use agent::tools::BuiltinRunner;
use agent::{Agent, ToolProtocol};
use cli::{Cli, Commands};
use config::{Config, ModelProvider};
use interest::InvestmentParameters;
use report::RateNotation;
use model_gateway::HostModelGateway;
use repl::run_repl;

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init();

    if let Some(Commands::Calc {
        principal,
        rate,
        years,
        monthly_expense,
    }) = cli.command
    {
        let params = InvestmentParameters {
            principal,
            annual_rate_percent: rate.value,
            term_years: years,
            monthly_expense,
        };
        return run_calc(params, rate.notation);
    }

    let cfg = Config::from_env();
    info!(
        provider = %cfg.model_provider,
        model = %cfg.model,
        model_base_url = %cfg.model_base_url,
        model_timeout_secs = cfg.model_timeout_secs,
        max_term_years = cfg.max_term_years,
        "loaded runtime configuration"
    );

    // Ollama models get the JSON reply convention instead of structured tool calls.
    let protocol = match cfg.provider() {
        Some(ModelProvider::OpenAi) => ToolProtocol::Native,
        _ => ToolProtocol::Text,
    };

    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.model_timeout_secs))
        .build()
        .context("Failed to initialize HTTP client")?;
    let mut agent = Agent::new(
        HostModelGateway::new(&client, &cfg),
        BuiltinRunner::new(cfg.max_term_years),
        &cfg.system_prompt,
        protocol,
    );

    match cli.command {
        Some(Commands::Ask { prompt }) => {
            let answer = agent.run_turn(&prompt.join(" ")).await?;
            println!("{}", answer.trim());
            Ok(())
        }
        _ => run_repl(&mut agent, &cfg.model).await,
    }
}

fn run_calc(params: InvestmentParameters, notation: RateNotation) -> Result<()> {
    let summary = interest::summarize(&params)?;
    println!("{}", report::render_report(&params, &summary, notation));
    Ok(())
}
